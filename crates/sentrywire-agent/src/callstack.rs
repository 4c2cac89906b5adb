//! Call-stack rendering, governed by the resolved rule's verbosity.

use backtrace::Backtrace;

use sentrywire_core::event::CALLSTACK_DISABLED;
use sentrywire_core::rules::StackVerbosity;

/// Frames joined with this separator in the rendered string.
const FRAME_SEPARATOR: &str = "|";

/// Upper bound on rendered frames; deep stacks are truncated.
const MAX_FRAMES: usize = 32;

/// Pipeline-internal frames skipped so the rendered stack starts at the
/// interception call-site.
const SKIP_PREFIXES: &[&str] = &[
    "backtrace::",
    "sentrywire_agent::callstack::render",
    "sentrywire_agent::callstack::collect",
    "sentrywire_agent::gateway::CaptureGateway",
];

struct FrameInfo {
    symbol: String,
    file: Option<String>,
    line: Option<u32>,
}

/// Render the current call stack at the given verbosity.
///
/// [`StackVerbosity::None`] costs nothing and yields the disabled marker; the
/// other levels walk and symbolicate the stack, which is why verbosity is a
/// per-event-type policy knob.
pub fn render(verbosity: StackVerbosity) -> String {
    match verbosity {
        StackVerbosity::None => CALLSTACK_DISABLED.to_string(),
        StackVerbosity::Limited => join(collect(), |f| f.symbol.clone()),
        StackVerbosity::SourceLocation => {
            let mut seen = Vec::new();
            for frame in collect() {
                if let Some(file) = frame.file {
                    if !seen.contains(&file) {
                        seen.push(file);
                    }
                }
            }
            seen.join(FRAME_SEPARATOR)
        }
        StackVerbosity::Full => join(collect(), |f| {
            format!(
                "{}:{}:{}",
                f.symbol,
                f.file.as_deref().unwrap_or("?"),
                f.line.map_or_else(|| "?".to_string(), |l| l.to_string()),
            )
        }),
    }
}

fn join(frames: Vec<FrameInfo>, render_frame: impl Fn(&FrameInfo) -> String) -> String {
    frames
        .iter()
        .map(render_frame)
        .collect::<Vec<_>>()
        .join(FRAME_SEPARATOR)
}

fn collect() -> Vec<FrameInfo> {
    let trace = Backtrace::new();
    let mut frames = Vec::new();
    for frame in trace.frames() {
        for symbol in frame.symbols() {
            let name = symbol
                .name()
                .map(|n| n.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            if SKIP_PREFIXES.iter().any(|p| name.starts_with(p)) {
                continue;
            }
            frames.push(FrameInfo {
                symbol: name,
                file: symbol.filename().map(|p| p.display().to_string()),
                line: symbol.lineno(),
            });
            if frames.len() >= MAX_FRAMES {
                return frames;
            }
        }
    }
    frames
}
