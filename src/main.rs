// main.rs
mod cli;

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use file_search::api::{format_file_size, ErrorResponse, IndexRequest, SearchRequest};
use file_search::query::parse_size;
use file_search::{AppConfig, EngineError, MatchLogic, SearchEngine, SearchEngineBuilder};

use cli::{Cli, Commands, SearchArgs};

fn main() -> Result<()> {
    let command_line = Cli::parse();
    init_tracing(command_line.verbose);

    // 引擎错误额外以 JSON 输出到 stderr，便于调用方按错误代码处理
    run(command_line).inspect_err(|err| {
        if let Some(engine_err) = err.downcast_ref::<EngineError>() {
            if let Ok(json) = serde_json::to_string(&ErrorResponse::from(engine_err)) {
                eprintln!("{}", json);
            }
        }
    })
}

fn run(command_line: Cli) -> Result<()> {
    let Some(command) = command_line.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let open_engine = || -> Result<SearchEngine> {
        let config = match command_line.config {
            Some(ref path) => AppConfig::load_from_file(path)
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("Load configuration from {:?}", path))?,
            None => AppConfig::load(),
        };

        let mut builder = SearchEngineBuilder::new().with_config(config);
        if let Some(ref storage) = command_line.storage {
            builder = builder.with_storage_path(storage);
        }
        builder.build().context("Open index storage")
    };

    match command {
        Commands::InitConfig { path } => {
            AppConfig::generate_default_config(&path)
                .map_err(|e| anyhow::anyhow!("{}", e))
                .with_context(|| format!("Write default configuration to {:?}", path))?;
            println!("默认配置已写入 {:?}", path);
        }
        Commands::Index { root_path, force, no_wait } => {
            let engine = open_engine()?;
            let request = IndexRequest::new(root_path.to_string_lossy(), force);
            let accepted = engine.index(&request).context("Start indexing")?;
            print_json(&accepted)?;
            if !no_wait {
                wait_for_run(&engine)?;
            }
        }
        Commands::Search(args) => {
            let engine = open_engine()?;
            let request = search_request(args, engine.config().search.default_limit)?;
            let response = engine.search(&request).context("Search")?;
            tracing::info!(
                "{} 条结果，共 {}",
                response.count,
                format_file_size(response.total_size)
            );
            print_json(&response)?;
        }
        Commands::Status => print_json(&open_engine()?.status())?,
        Commands::Stats => {
            print_json(&open_engine()?.statistics().context("Compute statistics")?)?
        }
        Commands::Duplicates => {
            print_json(&open_engine()?.duplicates().context("List duplicates")?)?
        }
        Commands::Content { file_path } => {
            let engine = open_engine()?;
            print_json(&engine.file_content(&file_path).context("Read file content")?)?
        }
        Commands::Remove { file_path } => {
            let engine = open_engine()?;
            engine.remove_file(&file_path).context("Remove index record")?;
            println!("已移除: {}", file_path);
        }
        Commands::History { limit } => {
            let engine = open_engine()?;
            print_json(&engine.search_history(limit).context("Read search history")?)?
        }
    }

    Ok(())
}

/// RUST_LOG 优先；否则按 -v 次数选择级别
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// 轮询状态直到任务结束，然后输出汇总
fn wait_for_run(engine: &SearchEngine) -> Result<()> {
    while engine.status().in_progress {
        let status = engine.status();
        tracing::info!(
            "进度 {:.1}%，已索引 {}，当前目录 {}",
            status.progress_percentage,
            status.total_indexed,
            status.current_directory.unwrap_or_default()
        );
        thread::sleep(Duration::from_millis(500));
    }

    if let Some(result) = engine.wait_for_indexing() {
        let summary = result.context("Indexing run failed")?;
        print_json(&summary)?;
    }
    Ok(())
}

fn search_request(args: SearchArgs, default_limit: usize) -> Result<SearchRequest> {
    let min_size = match args.min_size {
        Some(ref s) => parse_size(s).context("Parse --min-size")?,
        None => 0,
    };
    let max_size = args.max_size
        .as_deref()
        .map(parse_size)
        .transpose()
        .context("Parse --max-size")?;
    let logic = if args.all { MatchLogic::And } else { MatchLogic::Or };

    Ok(SearchRequest {
        extensions: Some(args.extensions),
        min_size,
        max_size,
        min_date: args.after,
        max_date: args.before,
        partial_names: Some(args.names),
        match_logic: logic,
        search_terms: Some(args.terms),
        case_sensitive: args.case_sensitive,
        owner_filter: args.owner,
        duplicates_only: args.duplicates,
        limit: args.limit.unwrap_or(default_limit as i64),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
