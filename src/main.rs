// A terminal shell over the retrieval engine: loads a corpus, optionally ranks it
// against a query image, and prints one page of the resulting order.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use chroma_retrieval::retrieval::{
    DEFAULT_CORPUS_SIZE, HistogramSet, ImageId, MIN_IMAGES_PER_PAGE, PageView, RetrievalConfig,
    RetrievalEngine, RetrievalMethod,
};

/// Browse an image corpus ranked by color-histogram similarity.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory holding the corpus images (1.<ext> .. N.<ext>)
    #[arg(short, long, default_value = "images")]
    images: PathBuf,

    /// Image file extension
    #[arg(short, long, default_value = "jpg")]
    extension: String,

    /// Number of corpus images; 0 discovers the contiguous run of files
    #[arg(short = 'n', long, default_value_t = DEFAULT_CORPUS_SIZE)]
    count: usize,

    /// Images shown per page
    #[arg(long, default_value_t = MIN_IMAGES_PER_PAGE)]
    per_page: usize,

    /// Query image identifier (1-based); without it the corpus order is shown
    #[arg(short, long)]
    query: Option<ImageId>,

    /// Feature space used for ranking: intensity, color-code or combined
    #[arg(short, long, default_value = "combined")]
    method: RetrievalMethod,

    /// Page to show (1-based)
    #[arg(short, long, default_value_t = 1)]
    page: usize,

    /// Images to mark as relevant; implies showing relevance marks
    #[arg(short, long, value_delimiter = ',')]
    relevant: Vec<ImageId>,

    /// Print the query image's histograms
    #[arg(long)]
    show_histograms: bool,

    /// Emit JSON instead of a listing
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct HistogramReport<'a> {
    image_id: ImageId,
    intensity: &'a [u64],
    color_code: &'a [u64],
    combined: &'a [f64],
}

#[derive(Serialize)]
struct Report<'a> {
    page: &'a PageView,
    #[serde(skip_serializing_if = "Option::is_none")]
    histograms: Option<HistogramReport<'a>>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    let config = RetrievalConfig {
        image_folder: args.images.clone(),
        extension: args.extension.clone(),
        corpus_size: (args.count > 0).then_some(args.count),
        images_per_page: args.per_page,
    };

    // --- 2. Corpus Loading ---
    let engine = RetrievalEngine::open(config)
        .with_context(|| format!("failed to load the corpus in {}", args.images.display()))?;

    // --- 3. Browsing Session ---
    let mut selection = engine.new_selection();
    for &id in &args.relevant {
        selection.set_relevant(id, true);
    }
    if !args.relevant.is_empty() {
        selection.toggle_show_relevance();
    }

    // --- 4. Ranking ---
    if let Some(query) = args.query {
        selection.select_query(query);
        engine
            .retrieve(&mut selection, args.method)
            .with_context(|| format!("failed to rank against image {query}"))?;
    }

    // --- 5. Paging ---
    let page = args.page.max(1) - 1;
    if !selection.go_to_page(page) {
        log::warn!(
            "Page {} does not exist ({} pages), showing page 1",
            args.page,
            selection.page_count()
        );
    }
    let view = engine.page_view(&selection);

    // --- 6. Rendering ---
    let histograms = requested_histograms(&engine, &args)?;

    if args.json {
        let report = Report {
            page: &view,
            histograms: histograms.map(|(image_id, set)| HistogramReport {
                image_id,
                intensity: set.intensity.bins(),
                color_code: set.color_code.bins(),
                combined: set.combined.values(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_page(&view);
        if let Some((query, set)) = histograms {
            print_histograms(query, set);
        }
    }

    Ok(())
}

/// The query's histograms, when `--show-histograms` asked for them.
fn requested_histograms<'a>(
    engine: &'a RetrievalEngine,
    args: &Args,
) -> anyhow::Result<Option<(ImageId, &'a HistogramSet)>> {
    match (args.show_histograms, args.query) {
        (true, Some(query)) => Ok(Some((query, engine.histograms(query)?))),
        (true, None) => {
            log::warn!("--show-histograms needs a --query image, no histograms printed");
            Ok(None)
        }
        (false, _) => Ok(None),
    }
}

fn print_page(view: &PageView) {
    match (view.query, view.method) {
        (Some(query), Some(method)) => {
            println!("Images ranked against {query} by the {method} method")
        }
        _ => println!("Images in corpus order"),
    }
    println!("Page {} / {}", view.page_number, view.page_count);

    for entry in &view.entries {
        let distance = match entry.distance {
            Some(distance) if distance.is_infinite() => "      inf".to_string(),
            Some(distance) => format!("{distance:>9.5}"),
            None => String::new(),
        };
        let relevance = match entry.relevant {
            Some(true) => " [relevant]",
            Some(false) => " [ ]",
            None => "",
        };
        println!("{:>4}  {:<12}{}{}", entry.position + 1, entry.file_name, distance, relevance);
    }
}

fn print_histograms(query: ImageId, set: &HistogramSet) {
    println!();
    println!("Histograms of image {query} ({} pixels)", set.pixel_count());
    println!("  intensity:  {:?}", set.intensity.bins());
    println!("  color code: {:?}", set.color_code.bins());
}
