//! Console rendering for log records and the `list` command.
//!
//! [`ConsoleSink`] writes records to stderr, colored unless `NO_COLOR` is
//! set. It also implements `log::Log` so engine tracing shares the same
//! console and level filter. Package listings support `human` (default) and
//! `json` outputs.

use crate::logger::{LogLevel, LogRecord, LogSink};
use crate::models::Repository;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

fn icon(level: LogLevel, color: bool) -> String {
    let (glyph, tag) = match level {
        LogLevel::Error => ("✖", "⟦error⟧"),
        LogLevel::Warn => ("▲", "⟦warn⟧"),
        LogLevel::Info => ("◆", "⟦info⟧"),
        LogLevel::Debug => ("·", "⟦debug⟧"),
    };
    if !color {
        return format!("{glyph} {tag}");
    }
    match level {
        LogLevel::Error => format!("{} {}", glyph.red(), tag.red().bold()),
        LogLevel::Warn => format!("{} {}", glyph.yellow(), tag.yellow().bold()),
        LogLevel::Info => format!("{} {}", glyph.blue(), tag.blue().bold()),
        LogLevel::Debug => format!("{} {}", glyph.bright_black(), tag.bright_black()),
    }
}

fn content_line(line: &str, color: bool) -> String {
    if !color {
        return format!("    {line}");
    }
    if line.starts_with("+ ") {
        format!("    {}", line.green())
    } else if line.starts_with("- ") {
        format!("    {}", line.red())
    } else {
        format!("    {}", line.bright_black())
    }
}

/// Render one record as console lines (pure).
pub fn render_record(record: &LogRecord, color: bool) -> String {
    let scope = match (&record.package, &record.rule) {
        (Some(p), Some(r)) => format!("❲{p} › {r}❳ "),
        (Some(p), None) => format!("❲{p}❳ "),
        (None, Some(r)) => format!("❲{r}❳ "),
        (None, None) => String::new(),
    };
    let scope = if color && !scope.is_empty() {
        scope.bold().to_string()
    } else {
        scope
    };
    let mut out = format!(
        "{} {}{}",
        icon(record.level, color),
        scope,
        record.message.message
    );
    for line in &record.message.additional_content {
        out.push('\n');
        out.push_str(&content_line(line, color));
    }
    if let Some(cause) = &record.message.error {
        out.push('\n');
        if color {
            out.push_str(&format!("    ↳ {}", cause.bright_black()));
        } else {
            out.push_str(&format!("    ↳ {cause}"));
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
/// Stderr sink filtered by a maximum level.
pub struct ConsoleSink {
    max_level: LogLevel,
    color: bool,
}

impl ConsoleSink {
    pub fn new(max_level: LogLevel) -> Self {
        Self {
            max_level,
            color: use_colors("human"),
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    fn accepts(&self, level: LogLevel) -> bool {
        level <= self.max_level
    }
}

impl LogSink for ConsoleSink {
    fn emit(&self, record: LogRecord) {
        if self.accepts(record.level) {
            eprintln!("{}", render_record(&record, self.color));
        }
    }
}

impl log::Log for ConsoleSink {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.accepts(metadata.level().into())
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("{} {}", record.target(), record.args());
        if self.color {
            eprintln!("{} {}", icon(record.level().into(), true), line.bright_black());
        } else {
            eprintln!("{} {}", icon(record.level().into(), false), line);
        }
    }

    fn flush(&self) {}
}

/// Print discovered packages in the requested format.
pub fn print_packages(repository: &Repository, output: &str) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_packages_json(repository)).unwrap_or_default()
        ),
        _ => {
            let color = use_colors(output);
            for p in &repository.packages {
                let kind = p.kind().map(|k| k.as_str()).unwrap_or("-");
                let name = p.name.as_deref().unwrap_or("(unnamed)");
                if color {
                    println!("{} {} {}", p.relative_path.bold(), name, kind.bright_black());
                } else {
                    println!("{} {} {}", p.relative_path, name, kind);
                }
            }
            let summary = format!(
                "— Summary — packages={} lintable={}",
                repository.packages.len(),
                repository.lintable_packages().count()
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{summary}");
            }
        }
    }
}

/// Compose the package listing JSON object (pure) for testing purposes.
pub fn compose_packages_json(repository: &Repository) -> JsonVal {
    let items: Vec<_> = repository
        .packages
        .iter()
        .map(|p| {
            json!({
                "name": p.name,
                "path": p.relative_path,
                "kind": p.kind().map(|k| k.as_str()),
                "lintable": p.is_lintable(),
            })
        })
        .collect();
    json!({
        "repository": repository.settings.repository,
        "sharedConfigs": repository.settings.shared_configs,
        "packages": items,
        "summary": {
            "total": repository.packages.len(),
            "lintable": repository.lintable_packages().count(),
        },
    })
}
