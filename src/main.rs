use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use movie_catalog::config::Configuration;
use movie_catalog::errors::ValidationError;
use movie_catalog::gateway::{DocumentStore, FirestoreStore, MemoryStore};
use movie_catalog::http::HttpClient;
use movie_catalog::models::{Item, MediaEntry, RatingBand, Status, Tag, TrailerLink};
use movie_catalog::pipeline::{SortSpec, StatusFilter};
use movie_catalog::settings::JsonFileSettings;
use movie_catalog::store::{Action, SortPreset, Store, ViewMode};
use movie_catalog::validation::{validate_item, MAX_RATING};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the visible part of the catalog
    List {
        /// all, toWatch, watching, watched or cancelled
        #[arg(long)]
        filter: Option<StatusFilter>,
        /// Title or tag substring, or _NO_TAGS_ / _HAS_RATING_
        #[arg(long)]
        search: Option<String>,
        /// field[:asc|desc], e.g. rating:desc
        #[arg(long, conflicts_with = "preset")]
        sort: Option<SortSpec>,
        /// title-asc, title-desc, newest, oldest, rating-desc, rating-asc,
        /// watched-newest or watched-oldest
        #[arg(long)]
        preset: Option<SortPreset>,
        /// Page to show in list view
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show every field of one item
    Show { id: String },
    /// Add a movie or series
    Add(AddArgs),
    /// Change the status of an item
    Status { id: String, status: Status },
    /// Rate an item from 0 to 100
    Rate { id: String, rating: u8 },
    /// Delete an item
    Remove { id: String },
    /// Switch between cards and list view
    View { mode: ViewMode },
    /// List tags with their usage
    Tags,
    /// Most used tags
    Popular {
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Create a tag
    TagAdd { name: String },
    /// Rename a tag on every item that uses it
    TagRename { id: String, name: String },
    /// Delete a tag and remove it from every item
    TagRemove { id: String },
}

#[derive(Args)]
struct AddArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    notes: String,
    #[arg(long, default_value = "toWatch")]
    status: Status,
    #[arg(long)]
    rating: Option<u8>,
    #[arg(long, value_delimiter = ',')]
    tags: Vec<String>,
    #[arg(long)]
    year: Option<i32>,
    #[arg(long)]
    director: Option<String>,
    #[arg(long)]
    poster: Option<String>,
    #[arg(long)]
    trailer: Option<String>,
    /// Image URL, may be repeated
    #[arg(long)]
    image: Vec<String>,
    /// Video URL, may be repeated
    #[arg(long)]
    video: Vec<String>,
    /// Movie running time in minutes
    #[arg(long, conflicts_with = "series")]
    duration: Option<u32>,
    #[arg(long)]
    series: bool,
    #[arg(long, requires = "series")]
    seasons: Option<u32>,
    #[arg(long, requires = "series")]
    episodes: Option<u32>,
    /// Minutes per episode
    #[arg(long, requires = "series")]
    episode_duration: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = if Path::new(&cli.config).exists() {
        info!("Configuration loaded from: {}", cli.config);
        Configuration::from_file(&cli.config)?
    } else {
        warn!("Configuration file {} not found, using defaults", cli.config);
        Configuration::default()
    };

    let backend: Arc<dyn DocumentStore> = match config.firestore.clone() {
        Some(firestore) => {
            info!("Using Firestore project {}", firestore.project_id);
            let http = HttpClient::new(config.http_timeout())?;
            Arc::new(FirestoreStore::new(http, firestore))
        }
        None => {
            warn!("No Firestore configuration found, changes will not be persisted");
            Arc::new(MemoryStore::new())
        }
    };

    let mut store = Store::new(backend)
        .with_settings(Box::new(JsonFileSettings::open(config.settings_path())))
        .with_date_watched_policy(config.date_watched_policy);

    store.load().await?;

    run(&mut store, &config, cli.command).await
}

async fn run(store: &mut Store, config: &Configuration, command: Command) -> Result<()> {
    match command {
        Command::List {
            filter,
            search,
            sort,
            preset,
            page,
        } => {
            if let Some(filter) = filter {
                store.dispatch(Action::SetFilter(filter));
            }
            if let Some(search) = search {
                store.dispatch(Action::SetSearch(search));
            }
            if let Some(preset) = preset {
                store.apply_sort_preset(preset);
            }
            if let Some(sort) = sort {
                store.dispatch(Action::SetSort(sort));
            }
            print_visible(store, page);
        }
        Command::Show { id } => print_details(store.find_item(&id)?),
        Command::Add(args) => {
            let item = build_item(args, config)?;
            let saved = store.create_item(item).await?;
            println!("Added {} ({})", saved.title, saved.id);
        }
        Command::Status { id, status } => {
            let today = Utc::now().date_naive();
            let saved = store.set_item_status(&id, status, today).await?;
            println!("{} is now {}", saved.title, saved.status);
        }
        Command::Rate { id, rating } => {
            if rating > MAX_RATING {
                return Err(ValidationError::RatingOutOfRange(rating).into());
            }
            let mut item = store.find_item(&id)?.clone();
            item.rating = Some(rating);
            let saved = store.update_item(item).await?;
            println!("Rated {} {}/100", saved.title, rating);
        }
        Command::Remove { id } => {
            store.delete_item(&id).await?;
            println!("Removed {}", id);
        }
        Command::View { mode } => {
            store.dispatch(Action::SetViewMode(mode));
            println!("View mode set to {}", mode);
        }
        Command::Tags => {
            let usage = store.tag_usage();
            if usage.is_empty() {
                println!("No tags yet.");
            }
            for entry in usage {
                println!("{:<24} {:>4} item(s)  [{}]", entry.tag.name, entry.count, entry.tag.id);
            }
        }
        Command::Popular { limit } => {
            for entry in store.popular_tags(limit) {
                println!("{:<24} {:>4}", entry.tag.name, entry.count);
            }
        }
        Command::TagAdd { name } => {
            let tag = store.create_tag(&name).await?;
            println!("Added tag {} ({})", tag.name, tag.id);
        }
        Command::TagRename { id, name } => {
            let tag = store.rename_tag_everywhere(Tag { id, name }).await?;
            println!("Renamed tag to {}", tag.name);
        }
        Command::TagRemove { id } => {
            store.delete_tag_everywhere(&id).await?;
            println!("Removed tag {}", id);
        }
    }

    Ok(())
}

fn build_item(args: AddArgs, config: &Configuration) -> Result<Item> {
    let mut item = Item::new(args.title.trim());
    item.description = args.description;
    item.notes = args.notes;
    item.tags = args
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .fold(Vec::new(), |mut tags, t| {
            if !tags.contains(&t) {
                tags.push(t);
            }
            tags
        });
    item.rating = args.rating;
    item.year = args.year;
    item.director = args.director;
    item.poster = args.poster;
    item.trailer_url = args.trailer;
    item.is_series = args.series;
    if args.series {
        item.seasons = Some(args.seasons.unwrap_or(1));
        item.episodes = args.episodes;
        item.episode_duration = args.episode_duration;
    } else {
        item.duration = args.duration;
    }
    for url in args.image {
        item.add_media(MediaEntry::Image { url });
    }
    for url in args.video {
        item.add_media(MediaEntry::Video { url });
    }
    item.set_status(args.status, Utc::now().date_naive(), config.date_watched_policy);

    if let Err(e) = validate_item(&item) {
        bail!("Invalid item: {}", e);
    }
    Ok(item)
}

fn print_visible(store: &Store, page: usize) {
    let state = store.state();

    match state.view_mode {
        ViewMode::List => {
            let page = store.visible_page(page);
            if page.total_items == 0 {
                println!("No items found. Try another filter or add something new.");
                return;
            }
            for item in &page.items {
                print_line(item);
            }
            println!("-- page {}/{} ({} items)", page.number, page.total_pages, page.total_items);
        }
        ViewMode::Cards => {
            let visible = store.visible_items();
            if visible.is_empty() {
                println!("No items found. Try another filter or add something new.");
                return;
            }
            for item in &visible {
                print_line(item);
            }
        }
    }
}

fn print_line(item: &Item) {
    let rating = item
        .shown_rating()
        .map(|r| format!("{}/100", r))
        .unwrap_or_else(|| "-".to_string());
    let watched = item
        .date_watched
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{:<34} {:<10} {:>7} {:>10}  {}  [{}]",
        item.title,
        item.status,
        rating,
        watched,
        item.tags.join(", "),
        item.id
    );
}

fn print_details(item: &Item) {
    println!("{} [{}]", item.title, item.id);
    if let Some(year) = item.year {
        println!("  year:      {}", year);
    }
    if let Some(director) = &item.director {
        println!("  director:  {}", director);
    }
    println!("  status:    {}", item.status);
    if let Some(rating) = item.shown_rating() {
        println!(
            "  rating:    {}/100 ({:?}, badge {})",
            rating,
            RatingBand::of(rating),
            RatingBand::badge_score(rating)
        );
    }
    if let Some(date) = item.date_watched {
        println!("  watched:   {}", date);
    }
    if let Some(added) = item.date_added {
        println!("  added:     {}", added.format("%Y-%m-%d"));
    }
    if item.is_series {
        println!(
            "  series:    {} season(s), {} episode(s) x {} min",
            item.seasons.unwrap_or(1),
            item.episodes.map_or("?".to_string(), |e| e.to_string()),
            item.episode_duration.map_or("?".to_string(), |d| d.to_string())
        );
    }
    if let Some(minutes) = item.effective_duration() {
        println!("  runtime:   {}h {:02}m", minutes / 60, minutes % 60);
    }
    if !item.tags.is_empty() {
        println!("  tags:      {}", item.tags.join(", "));
    }
    if let Some(url) = &item.trailer_url {
        match TrailerLink::parse(url).ok().and_then(|link| link.embed_url()) {
            Some(embed) => println!("  trailer:   {} (embed: {})", url, embed),
            None => println!("  trailer:   {}", url),
        }
    }
    for (index, media) in item.images.iter().enumerate() {
        let kind = match media {
            MediaEntry::Image { .. } => "image",
            MediaEntry::Video { .. } => "video",
        };
        println!("  media #{}:  {} {}", index, kind, media.url());
    }
    if !item.description.is_empty() {
        println!("\n{}", item.description);
    }
    if !item.notes.is_empty() {
        println!("\nNotes: {}", item.notes);
    }
}
