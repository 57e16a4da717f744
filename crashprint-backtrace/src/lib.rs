#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Stack backtraces for crashprint reports.
//!
//! A crashprint report prints the frames of every
//! [`TracedError`](crashprint::TracedError) in the cause chain. When the
//! failure carries no frames at all, the report falls back to the current
//! stack, as captured by the environment's
//! [`StackCapture`](crashprint::StackCapture). The default capture only
//! records the caller of `emit`; this crate captures a real backtrace instead.
//!
//! # Quick Start
//!
//! ## As the Environment's Stack Capture
//!
//! ```rust
//! use crashprint::{Environment, VersionInfo, inventory::StaticInventory};
//! use crashprint_backtrace::BacktraceCapture;
//!
//! let environment = Environment::new(StaticInventory::default(), VersionInfo::unknown("2.1.0"))
//!     .stack_capture(BacktraceCapture::new_from_env());
//! ```
//!
//! ## Per Error
//!
//! Replace the frames of a [`TracedError`] with the current backtrace:
//!
//! ```rust
//! use crashprint::TracedError;
//! use crashprint_backtrace::BacktraceExt;
//!
//! fn compile_script() -> Result<(), TracedError> {
//!     Err(TracedError::new("unknown effect 'explode'"))
//! }
//!
//! let result = compile_script().attach_backtrace();
//! assert!(result.is_err());
//! ```
//!
//! A captured frame is printed like this:
//!
//! ```text
//! #!#! unknown effect 'explode'
//! #!#!     at compile_script ([..]/scroll/src/compiler.rs:42:13)
//! #!#!     at main (src/main.rs:12:5)
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_BACKTRACE=full` - Disables filtering and shows full paths and
//!   symbols
//! - `CRASHPRINT_BACKTRACE` - Comma-separated options:
//!   - `full_paths` - Show full file paths in backtraces
//!
//! # Path privacy
//!
//! Paths below a known prefix (the Rust sources, the Cargo registry, this
//! workspace) are shortened, but other paths are printed as they are and may
//! expose the build machine's file system layout. Use
//! `--remap-path-prefix` when building releases:
//!
//! ```sh
//! export RUSTFLAGS="--remap-path-prefix=$HOME=/home/user --remap-path-prefix=$PWD=/build"
//! ```
//!
//! # Filtering
//!
//! ```rust
//! use crashprint_backtrace::{BacktraceCapture, BacktraceFilter};
//!
//! let capture = BacktraceCapture {
//!     filter: BacktraceFilter {
//!         skipped_initial_crates: &["crashprint", "crashprint-backtrace"],
//!         skipped_middle_crates: &["tokio"],
//!         skipped_final_crates: &["std"],
//!         max_entry_count: 15,
//!         show_full_path: false,
//!         show_full_symbols: false,
//!     },
//! };
//! ```

use std::{borrow::Cow, panic::Location, sync::OnceLock};

use crashprint::{StackCapture, StackFrame, TracedError};

/// A filtered stack backtrace.
///
/// # Examples
///
/// ```rust
/// use crashprint_backtrace::{Backtrace, BacktraceFilter};
///
/// let backtrace = Backtrace::capture(&BacktraceFilter::DEFAULT);
/// println!(
///     "captured {} frames, omitted {}",
///     backtrace.frames.len(),
///     backtrace.total_omitted_frames
/// );
/// ```
#[derive(Debug)]
pub struct Backtrace {
    /// The kept frames, innermost first.
    pub frames: Vec<StackFrame>,
    /// Number of frames left out by the filter.
    pub total_omitted_frames: usize,
}

/// File path information for a stack frame.
#[derive(Debug)]
pub struct FramePath {
    /// The raw file path from the debug information.
    pub raw_path: String,
    /// The crate name, if it could be derived from the path.
    pub crate_name: Option<Cow<'static, str>>,
    /// The path split at a known prefix.
    pub split_path: Option<FramePrefix>,
}

/// A path split into a known prefix and the rest.
#[derive(Debug)]
pub struct FramePrefix {
    /// Which known prefix was found: `RUST_SRC`, `CARGO` or `CRASHPRINT`.
    pub prefix_kind: &'static str,
    /// The removed prefix.
    ///
    /// Example: `"/home/user/.cargo/registry/src/index.crates.
    /// io-1949cf8c6b5b557f"`
    pub prefix: String,
    /// The path below the prefix.
    ///
    /// Example: `"indexmap-2.12.1/src/map/core/entry.rs"`
    pub suffix: String,
}

/// Reduces a demangled symbol to the name of its function.
fn get_function_name(s: &str) -> &str {
    let mut word_start = 0usize;
    let mut word_end = 0usize;
    let mut angle_nesting_level = 0u64;
    let mut curly_nesting_level = 0u64;
    let mut potential_function_arrow = false;
    let mut inside_word = false;

    for (i, c) in s.char_indices() {
        if curly_nesting_level == 0 && angle_nesting_level == 0 {
            if !inside_word && unicode_ident::is_xid_start(c) {
                word_start = i;
                inside_word = true;
            } else if inside_word && !unicode_ident::is_xid_continue(c) {
                word_end = i;
                inside_word = false;
            }
        }

        let was_potential_function_arrow = potential_function_arrow;
        potential_function_arrow = c == '-';

        match c {
            '<' => angle_nesting_level = angle_nesting_level.saturating_add(1),
            '>' if !was_potential_function_arrow => {
                angle_nesting_level = angle_nesting_level.saturating_sub(1);
            }
            '{' => {
                curly_nesting_level = curly_nesting_level.saturating_add(1);
                if !inside_word && curly_nesting_level == 1 && angle_nesting_level == 0 {
                    word_start = i;
                    inside_word = true;
                }
            }
            '}' => {
                curly_nesting_level = curly_nesting_level.saturating_sub(1);
                if inside_word && curly_nesting_level == 0 {
                    word_end = i + 1;
                    inside_word = false;
                }
            }
            _ => {}
        }
    }

    if word_start < word_end {
        &s[word_start..word_end]
    } else {
        // The last word runs to the end of the symbol
        &s[word_start..]
    }
}

/// [`StackCapture`] backed by a real stack backtrace.
///
/// Falls back to the caller location when every frame is filtered out or
/// the platform cannot unwind.
#[derive(Copy, Clone, Debug, Default)]
pub struct BacktraceCapture {
    /// Which frames to keep and how to print them.
    pub filter: BacktraceFilter,
}

/// Configuration for filtering frames from certain crates in a backtrace.
///
/// # Examples
///
/// ```rust
/// use crashprint_backtrace::BacktraceFilter;
///
/// let filter = BacktraceFilter {
///     // Hide framework frames in the middle
///     skipped_middle_crates: &["tokio", "hyper", "tower"],
///     // Show only the most relevant 10 frames
///     max_entry_count: 10,
///     ..BacktraceFilter::DEFAULT
/// };
/// ```
#[derive(Copy, Clone, Debug)]
pub struct BacktraceFilter {
    /// Crates whose frames are hidden at the beginning of a backtrace.
    pub skipped_initial_crates: &'static [&'static str],
    /// Crates whose frames are hidden in the middle of a backtrace. A single
    /// frame from such a crate is kept; longer runs are left out.
    pub skipped_middle_crates: &'static [&'static str],
    /// Crates whose frames are hidden at the end of a backtrace.
    pub skipped_final_crates: &'static [&'static str],
    /// Maximum number of frames to keep.
    pub max_entry_count: usize,
    /// Print full file paths instead of shortened ones.
    pub show_full_path: bool,
    /// Print full demangled symbols instead of bare function names.
    pub show_full_symbols: bool,
}

impl BacktraceFilter {
    /// Default backtrace filter settings.
    pub const DEFAULT: Self = Self {
        skipped_initial_crates: &[
            "backtrace",
            "crashprint",
            "crashprint-backtrace",
            "core",
            "std",
            "alloc",
        ],
        skipped_middle_crates: &["std", "core", "alloc", "tokio"],
        skipped_final_crates: &["std", "core", "alloc", "tokio"],
        max_entry_count: 20,
        show_full_path: false,
        show_full_symbols: false,
    };

    /// Keeps every frame.
    pub const FULL: Self = Self {
        skipped_initial_crates: &[],
        skipped_middle_crates: &[],
        skipped_final_crates: &[],
        max_entry_count: usize::MAX,
        show_full_path: true,
        show_full_symbols: true,
    };
}

impl Default for BacktraceFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug)]
struct CrashprintEnvOptions {
    rust_backtrace_full: bool,
    show_full_path: bool,
}

impl CrashprintEnvOptions {
    fn get() -> &'static Self {
        static CRASHPRINT_FLAGS: OnceLock<CrashprintEnvOptions> = OnceLock::new();

        CRASHPRINT_FLAGS.get_or_init(|| {
            let rust_backtrace_full =
                std::env::var_os("RUST_BACKTRACE").is_some_and(|var| var == "full");
            let mut show_full_path = rust_backtrace_full;
            if let Some(var) = std::env::var_os("CRASHPRINT_BACKTRACE") {
                for v in var.to_string_lossy().split(',') {
                    if v.trim().eq_ignore_ascii_case("full_paths") {
                        show_full_path = true;
                    }
                }
            }
            CrashprintEnvOptions {
                rust_backtrace_full,
                show_full_path,
            }
        })
    }
}

impl BacktraceCapture {
    /// Creates a capture configured from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `RUST_BACKTRACE=full` - Disables all filtering and shows full paths
    ///   and symbols
    /// - `CRASHPRINT_BACKTRACE=full_paths` - Shows full file paths
    ///
    /// Both are read once per process.
    pub fn new_from_env() -> Self {
        let env_options = CrashprintEnvOptions::get();

        Self {
            filter: if env_options.rust_backtrace_full {
                BacktraceFilter::FULL
            } else {
                BacktraceFilter {
                    show_full_path: env_options.show_full_path,
                    ..BacktraceFilter::DEFAULT
                }
            },
        }
    }
}

impl StackCapture for BacktraceCapture {
    fn capture(&self, caller: &'static Location<'static>) -> Vec<StackFrame> {
        let backtrace = Backtrace::capture(&self.filter);
        if backtrace.frames.is_empty() {
            vec![StackFrame::from_location(caller)]
        } else {
            backtrace.frames
        }
    }
}

const fn get_crashprint_backtrace_matcher(
    location: &'static Location<'static>,
) -> Option<(&'static str, usize)> {
    let file = location.file();

    let Some(prefix_len) = file.len().checked_sub("/src/lib.rs".len()) else {
        return None;
    };

    let (prefix, suffix) = file.split_at(prefix_len);
    // Evaluated at compile time: the location must point at a crate root
    if std::path::MAIN_SEPARATOR == '/' {
        assert!(suffix.eq_ignore_ascii_case("/src/lib.rs"));
    } else {
        assert!(suffix.eq_ignore_ascii_case(r#"/src\lib.rs"#));
    }

    let (matcher_prefix, _) = file.split_at(prefix_len + 4);

    let mut splitter_prefix = prefix;
    while !splitter_prefix.is_empty() {
        let (new_prefix, last_char) = splitter_prefix.split_at(splitter_prefix.len() - 1);
        splitter_prefix = new_prefix;
        if last_char.eq_ignore_ascii_case(std::path::MAIN_SEPARATOR_STR) {
            break;
        }
    }

    Some((matcher_prefix, splitter_prefix.len()))
}

const CRASHPRINT_BACKTRACE_MATCHER: Option<(&str, usize)> =
    get_crashprint_backtrace_matcher(Location::caller());
const CRASHPRINT_MATCHER: Option<(&str, usize)> =
    get_crashprint_backtrace_matcher(crashprint::__private::CRASHPRINT_LOCATION);

/// A resolved frame before filtering and formatting.
struct RawFrame {
    symbol: String,
    path: FramePath,
    line: Option<u32>,
    column: Option<u32>,
}

impl RawFrame {
    fn crate_name(&self) -> Option<&str> {
        self.path.crate_name.as_deref()
    }

    fn is_runtime_tail(&self, filter: &BacktraceFilter) -> bool {
        self.crate_name()
            .is_some_and(|name| filter.skipped_final_crates.contains(&name))
            || matches!(
                self.symbol.as_str(),
                "__libc_start_call_main" | "__libc_start_main_impl"
            )
            || (self.symbol == "_start" && self.path.raw_path.contains("zig/libc/glibc"))
    }

    fn into_stack_frame(self, filter: &BacktraceFilter) -> StackFrame {
        let function = if filter.show_full_symbols {
            self.symbol
        } else {
            get_function_name(&self.symbol).to_string()
        };
        let file = match self.path.split_path {
            Some(split_path) if !filter.show_full_path => format!("[..]/{}", split_path.suffix),
            _ => self.path.raw_path,
        };
        StackFrame {
            function: Some(function.into()),
            file: Some(file.into()),
            line: self.line,
            column: self.column,
        }
    }
}

/// A run of consecutive frames from a crate hidden in the middle of a
/// backtrace.
struct OmittedRun {
    crate_name: &'static str,
    /// Kept unless the run grows beyond a single frame.
    first: Option<RawFrame>,
}

struct FrameCollector<'f> {
    filter: &'f BacktraceFilter,
    initial_filtering: bool,
    frames: Vec<RawFrame>,
    omitted: usize,
    run: Option<OmittedRun>,
}

impl<'f> FrameCollector<'f> {
    fn new(filter: &'f BacktraceFilter) -> Self {
        Self {
            filter,
            initial_filtering: !filter.skipped_initial_crates.is_empty(),
            frames: Vec::new(),
            omitted: 0,
            run: None,
        }
    }

    fn push(&mut self, frame: RawFrame) {
        if self.frames.len() >= self.filter.max_entry_count {
            self.omitted += 1;
            return;
        }

        if self.initial_filtering {
            if frame
                .crate_name()
                .is_some_and(|name| self.filter.skipped_initial_crates.contains(&name))
            {
                self.omitted += 1;
                return;
            }
            self.initial_filtering = false;
        }

        if let Some(run) = &mut self.run
            && frame.crate_name() == Some(run.crate_name)
        {
            if run.first.take().is_some() {
                self.omitted += 1;
            }
            self.omitted += 1;
            return;
        }

        self.flush_run();

        let skipped_crate = frame.crate_name().and_then(|name| {
            self.filter
                .skipped_middle_crates
                .iter()
                .copied()
                .find(|&crate_name| crate_name == name)
        });
        if let Some(crate_name) = skipped_crate {
            self.run = Some(OmittedRun {
                crate_name,
                first: Some(frame),
            });
            return;
        }

        self.frames.push(frame);
    }

    fn flush_run(&mut self) {
        if let Some(run) = self.run.take()
            && let Some(first) = run.first
        {
            self.frames.push(first);
        }
    }

    fn finish(mut self) -> Backtrace {
        self.flush_run();

        while let Some(last) = self.frames.last()
            && last.is_runtime_tail(self.filter)
        {
            self.frames.pop();
            self.omitted += 1;
        }

        let filter = self.filter;
        Backtrace {
            frames: self
                .frames
                .into_iter()
                .map(|frame| frame.into_stack_frame(filter))
                .collect(),
            total_omitted_frames: self.omitted,
        }
    }
}

impl Backtrace {
    /// Captures the current stack backtrace, applying `filter`.
    pub fn capture(filter: &BacktraceFilter) -> Self {
        let mut collector = FrameCollector::new(filter);

        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                // Don't consider frames without symbol names or filenames.
                let (Some(sym), Some(filename_raw)) = (symbol.name(), symbol.filename_raw()) else {
                    return;
                };

                collector.push(RawFrame {
                    symbol: format!("{sym:#}"),
                    path: FramePath::new(&filename_raw.to_str_lossy()),
                    line: symbol.lineno(),
                    column: symbol.colno(),
                });
            });

            true
        });

        collector.finish()
    }
}

fn path_regexes() -> &'static [regex::Regex; 2] {
    static REGEXES: OnceLock<[regex::Regex; 2]> = OnceLock::new();
    REGEXES.get_or_init(|| {
        [
            // Matches Rust standard library paths:
            // - /lib/rustlib/src/rust/library/{std|core|alloc}/src/...
            // - /rustc/{40-char-hash}/library/{std|core|alloc}/src/...
            regex::Regex::new(
                r"(?:/lib/rustlib/src/rust|^/rustc/[0-9a-f]{40})/library/(std|core|alloc)/src/.*$",
            )
            .expect("built-in regex pattern for std library paths should be valid"),
            // Matches Cargo registry paths:
            // - /.cargo/registry/src/{index}-{16-char-hash}/{crate}-{version}/src/...
            regex::Regex::new(
                r"/\.cargo/registry/src/[^/]+-[0-9a-f]{16}/([^./]+)-[0-9]+\.[^/]*/src/.*$",
            )
            .expect("built-in regex pattern for cargo registry paths should be valid"),
        ]
    })
}

impl FramePath {
    /// Classifies `path` by its known prefix, if any.
    pub fn new(path: &str) -> Self {
        let [std_regex, registry_regex] = path_regexes();

        for (regex, prefix_kind) in [(std_regex, "RUST_SRC"), (registry_regex, "CARGO")] {
            if let Some(crate_capture) = regex.captures(path).and_then(|captures| captures.get(1)) {
                let split = crate_capture.start();
                return Self::split(
                    path,
                    split - 1,
                    split,
                    prefix_kind,
                    Cow::Owned(crate_capture.as_str().to_string()),
                );
            }
        }

        for (matcher, crate_name) in [
            (CRASHPRINT_MATCHER, "crashprint"),
            (CRASHPRINT_BACKTRACE_MATCHER, "crashprint-backtrace"),
        ] {
            if let Some((matcher_prefix, splitter_prefix_len)) = matcher
                && path.starts_with(matcher_prefix)
            {
                return Self::split(
                    path,
                    splitter_prefix_len,
                    splitter_prefix_len + 1,
                    "CRASHPRINT",
                    Cow::Borrowed(crate_name),
                );
            }
        }

        Self {
            raw_path: path.to_string(),
            crate_name: None,
            split_path: None,
        }
    }

    fn split(
        path: &str,
        prefix_end: usize,
        suffix_start: usize,
        prefix_kind: &'static str,
        crate_name: Cow<'static, str>,
    ) -> Self {
        Self {
            raw_path: path.to_string(),
            crate_name: Some(crate_name),
            split_path: Some(FramePrefix {
                prefix_kind,
                prefix: path[..prefix_end].to_string(),
                suffix: path[suffix_start..].to_string(),
            }),
        }
    }
}

/// Extension trait for replacing the frames of a [`TracedError`] with a
/// captured backtrace.
///
/// # Examples
///
/// ```rust
/// use crashprint::TracedError;
/// use crashprint_backtrace::{BacktraceExt, BacktraceFilter};
///
/// let filter = BacktraceFilter {
///     max_entry_count: 10,
///     ..BacktraceFilter::DEFAULT
/// };
///
/// let err = TracedError::new("script cache corrupted").attach_backtrace_with_filter(&filter);
/// assert!(!err.frames().is_empty());
/// ```
pub trait BacktraceExt: Sized {
    /// Replaces the frames with a backtrace captured using the default filter.
    fn attach_backtrace(self) -> Self {
        self.attach_backtrace_with_filter(&BacktraceFilter::DEFAULT)
    }

    /// Replaces the frames with a backtrace captured using `filter`.
    ///
    /// The existing frames are kept if every captured frame is filtered out.
    fn attach_backtrace_with_filter(self, filter: &BacktraceFilter) -> Self;
}

impl BacktraceExt for TracedError {
    fn attach_backtrace_with_filter(self, filter: &BacktraceFilter) -> Self {
        let backtrace = Backtrace::capture(filter);
        if backtrace.frames.is_empty() {
            self
        } else {
            self.with_frames(backtrace.frames)
        }
    }
}

impl<T> BacktraceExt for Result<T, TracedError> {
    fn attach_backtrace_with_filter(self, filter: &BacktraceFilter) -> Self {
        self.map_err(|err| err.attach_backtrace_with_filter(filter))
    }
}
