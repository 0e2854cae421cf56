use std::error::Error;
use std::sync::Arc;

use album::{Album, MemoryStore};
use clap::Parser;
use flickr::{FlickrClient, FlickrCredentials, SearchPage};
use image_cache::ImageCache;
use utility::geo::Coordinate;

/// Search Flickr around a coordinate and cache the images found there.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    #[arg(allow_hyphen_values = true)]
    latitude: f64,

    #[arg(allow_hyphen_values = true)]
    longitude: f64,

    /// Ask for this page instead of the first one
    #[arg(long, conflicts_with = "random")]
    page: Option<u32>,

    /// Ask for a random page instead of the first one
    #[arg(long)]
    random: bool,

    #[arg(long, default_value_t = album::DEFAULT_PER_PAGE)]
    per_page: u32,

    /// Download every image of the page into the cache
    #[arg(long)]
    images: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();
    if let Err(why) = run(args).await {
        log::error!("{}", why);
        eprintln!("error: {why}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let coordinate = Coordinate::new(args.latitude, args.longitude)?;
    let credentials = FlickrCredentials::from_env().ok_or("expected FLICKR_API_KEY in env.")?;
    let cache = ImageCache::from_env().ok_or("could not determine an image cache directory.")?;
    log::info!("caching images in {:?}", cache.dir());

    let client = Arc::new(FlickrClient::new(&credentials)?);
    let album = Album::new(MemoryStore::new(), client, Arc::new(cache)).with_per_page(args.per_page);

    let pin = album.drop_pin(coordinate).await?;
    println!("bbox: {}", pin.bounding_box());

    let photos = match (args.page, args.random) {
        (Some(page), _) => album.replace_collection(&pin.id, SearchPage::Fixed(page)).await?,
        (None, true) => album.new_collection(&pin.id).await?,
        (None, false) => album.photos(&pin.id).await?,
    };
    println!("json: {}", serde_json::to_string_pretty(&photos)?);

    if args.images {
        for photo in &photos {
            match album.image(photo).await {
                Ok(bytes) => println!("{}: {} bytes", photo.id, bytes.len()),
                Err(why) => log::warn!("skipping photo {}: {}", photo.id, why),
            }
        }
    }

    Ok(())
}
