use std::{path::Path, process, sync::Arc};

use qbank_render::{
    api_types::{parse_categories, parse_questions},
    application::{
        enhance::{
            Clipboard, CommandClipboard, DiagramEngine, Enhancer, MermaidCliEngine, NoClipboard,
            UnavailableEngine,
        },
        error::AppError,
        hot::{CategoryIndex, HotWindow, RankBadge, build_pool},
        render::{
            RenderPipelineConfig, TocEntry, configure_render_service, extract_toc, render_service,
        },
        view::{ContentViewProps, StableContentView},
    },
    config::{self, HotArgs, PreviewArgs, RenderArgs, Settings, TocArgs},
    infra::{error::InfraError, telemetry},
};
use serde::Serialize;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let chain = error.chain().join(": ");
    if dispatcher::has_been_set() {
        error!(error = %chain, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    telemetry::init(&settings.logging)?;
    configure_render_service(RenderPipelineConfig::from(&settings.render))?;

    match cli_args.command {
        config::Command::Render(args) => run_render(args).await,
        config::Command::Toc(args) => run_toc(args).await,
        config::Command::Hot(args) => run_hot(args).await,
        config::Command::Preview(args) => run_preview(&settings, args).await,
    }
}

async fn read_input(path: &Path) -> Result<String, AppError> {
    tokio::fs::read_to_string(path).await.map_err(|err| {
        AppError::from(InfraError::input(format!(
            "failed to read {}: {err}",
            path.display()
        )))
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{json}");
    Ok(())
}

async fn run_render(args: RenderArgs) -> Result<(), AppError> {
    let markdown = read_input(&args.file).await?;
    let fragment = render_service().render(&markdown);

    info!(
        target = "qbank::render",
        file = %args.file.display(),
        headings = fragment.headings.len(),
        code_blocks = fragment.code_blocks.len(),
        diagrams = fragment.diagrams.len(),
        "Rendered document"
    );

    if args.json {
        print_json(&fragment)
    } else {
        println!("{}", fragment.html);
        Ok(())
    }
}

async fn run_toc(args: TocArgs) -> Result<(), AppError> {
    let markdown = read_input(&args.file).await?;
    let html = render_service().render(&markdown).html;
    print_json(&extract_toc(&html))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HotRound<'a> {
    round: u32,
    offset: usize,
    entries: Vec<HotEntry<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HotEntry<'a> {
    rank: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    badge: Option<RankBadge>,
    id: i64,
    title: &'a str,
    hot_score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<&'a str>,
}

async fn run_hot(args: HotArgs) -> Result<(), AppError> {
    let body = read_input(&args.questions).await?;
    let questions = parse_questions(&body).map_err(|err| {
        AppError::validation(format!(
            "{} is not a questions array: {err}",
            args.questions.display()
        ))
    })?;

    let categories = match args.categories.as_ref() {
        Some(path) => {
            let body = read_input(path).await?;
            let categories = parse_categories(&body).map_err(|err| {
                AppError::validation(format!(
                    "{} is not a categories array: {err}",
                    path.display()
                ))
            })?;
            CategoryIndex::new(&categories)
        }
        None => CategoryIndex::default(),
    };

    let pool = build_pool(&questions);
    let mut window = HotWindow::new(pool.normalize_offset(args.offset));
    let mut rounds = Vec::new();
    for round in 1..=args.rounds {
        let entries = pool
            .ranked_window(window.offset())
            .into_iter()
            .map(|ranked| HotEntry {
                rank: ranked.rank,
                badge: ranked.badge,
                id: ranked.question.id,
                title: &ranked.question.title,
                hot_score: ranked.question.effective_hot_score(),
                category: categories.name(ranked.question.category_id),
            })
            .collect();
        rounds.push(HotRound {
            round,
            offset: window.offset(),
            entries,
        });
        window.advance(pool.len());
    }

    info!(
        target = "qbank::hot",
        questions = questions.len(),
        pool = pool.len(),
        rounds = args.rounds,
        "Hot feed computed"
    );
    print_json(&rounds)
}

#[derive(Debug, Serialize)]
struct PreviewOutput {
    html: String,
    toc: Vec<TocEntry>,
}

async fn run_preview(settings: &Settings, args: PreviewArgs) -> Result<(), AppError> {
    let markdown = read_input(&args.file).await?;
    let html = render_service().render(&markdown).html;

    let enhancer = Enhancer::new(build_clipboard(settings), build_engine(settings))
        .with_copy_feedback(settings.view.copy_feedback);
    let mut view =
        StableContentView::new(Arc::new(enhancer)).with_delay(settings.view.enhance_delay);
    view.update(ContentViewProps::new(html.clone()).with_class_name("question-content"))?;
    view.settle().await;

    let output = PreviewOutput {
        html: view.container_html(),
        toc: extract_toc(&html),
    };
    view.unmount();
    print_json(&output)
}

fn build_engine(settings: &Settings) -> Arc<dyn DiagramEngine> {
    match MermaidCliEngine::new(
        settings.render.mermaid_cli_path.clone(),
        settings.render.mermaid_cache_dir.clone(),
    ) {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            warn!(
                target = "qbank::preview",
                cli_path = %settings.render.mermaid_cli_path.display(),
                cache_dir = %settings.render.mermaid_cache_dir.display(),
                error = %err,
                "Mermaid engine disabled"
            );
            Arc::new(UnavailableEngine::new(err.to_string()))
        }
    }
}

fn build_clipboard(settings: &Settings) -> Arc<dyn Clipboard> {
    match settings
        .view
        .clipboard_command
        .as_deref()
        .and_then(CommandClipboard::from_command_line)
    {
        Some(clipboard) => Arc::new(clipboard),
        None => Arc::new(NoClipboard),
    }
}
