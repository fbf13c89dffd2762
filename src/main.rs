use std::io::{self, BufRead, Write};
use std::sync::{mpsc, Arc};

use chat_translate::config::{self, Settings};
use chat_translate::replay::{self, Replay, ReplayOutput};
use chat_translate::{plugin, translation, Annotations, JsonFileStore, MessageId, TranslationResult};
use log::{error, info, warn};

// ─── Logging & history helpers ────────────────────────────────────────

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

fn rotate_file(path: &std::path::Path) {
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.len() >= MAX_LOG_SIZE {
            let old = path.with_extension("old");
            let _ = std::fs::rename(path, old);
        }
    }
}

fn setup_logging(level: log::LevelFilter) {
    let log_path = config::config_dir().join("chat-translate.log");
    rotate_file(&log_path);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339_millis(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(file) = log_file {
        dispatch = dispatch.chain(file);
    } else {
        eprintln!("Warning: could not open log file {}", log_path.display());
    }

    if let Err(e) = dispatch.apply() {
        eprintln!("Warning: logger already initialized: {}", e);
    }
}

fn append_translation_history(lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let history_path = config::config_dir().join("translations.history");
    rotate_file(&history_path);

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&history_path)
    else {
        error!("Failed to open translation history file");
        return;
    };

    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    for line in lines {
        let _ = writeln!(file, "[{}] {}", now, line);
    }
}

// ─── Output ──────────────────────────────────────────────────────────

fn annotation_line(replay: &Replay, id: &MessageId, result: &TranslationResult) -> String {
    let rendered = replay
        .render(id)
        .unwrap_or_else(|| plugin::render_annotation(result));
    format!("#{} {}", id, rendered)
}

fn output_line(output: &ReplayOutput) -> String {
    match output {
        ReplayOutput::Sent(draft) => format!("> [{}] {}", draft.channel_id, draft.content),
        ReplayOutput::TranslateFailed { message_id, error } => {
            format!("! #{} translation failed: {}", message_id, error)
        }
        ReplayOutput::SendTranslate(enabled) => format!(
            "* translate on send {}",
            if *enabled { "on" } else { "off" }
        ),
        ReplayOutput::Ignored(reason) => format!("? {}", reason),
    }
}

// ─── Main ────────────────────────────────────────────────────────────

fn main() {
    let loaded = Settings::load();
    let (initial, persist) = match &loaded {
        Ok(settings) => (settings.clone(), true),
        Err(_) => (Settings::default(), false),
    };
    setup_logging(initial.log_level_filter());

    info!("chat-translate starting");
    if let Err(e) = &loaded {
        error!("{}; running with defaults and not saving settings", e);
    }

    let settings = config::shared(initial.clone());
    let translator = match translation::from_settings(&settings) {
        Ok(translator) => translator,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(JsonFileStore::new(config::config_dir().join("datastore.json")));
    let (annotation_tx, annotation_rx) = mpsc::channel();
    let mut replay = match Replay::new(
        translator,
        store,
        Annotations::with_listener(annotation_tx),
        settings.clone(),
    ) {
        Ok(replay) => replay,
        Err(e) => {
            error!("Failed to start replay: {}", e);
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut history = Vec::new();

    for (n, line) in io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match replay::parse_line(&line) {
            Ok(event) => {
                if let Some(output) = replay.apply(event) {
                    let text = output_line(&output);
                    let _ = writeln!(out, "{}", text);
                    if matches!(output, ReplayOutput::Sent(_)) {
                        history.push(text);
                    }
                }
            }
            Err(e) => warn!("Line {}: {}", n + 1, e),
        }

        for (id, result) in annotation_rx.try_iter() {
            let text = annotation_line(&replay, &id, &result);
            let _ = writeln!(out, "{}", text);
            history.push(text);
        }
    }

    replay.finish();
    for (id, result) in annotation_rx.try_iter() {
        let text = plugin::render_annotation(&result);
        let _ = writeln!(out, "#{} {}", id, text);
        history.push(format!("#{} {}", id, text));
    }

    append_translation_history(&history);
    if persist {
        config::snapshot(&settings).save_if_changed(&initial);
    }
    info!("chat-translate finished");
}
