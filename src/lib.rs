//! # BeanScript
//!
//! An interpreter for BeanScript, a small line-oriented language that
//! describes sequences and schedules of synthetic keystrokes.
//!
//! A script defines named keystrokes, composes them into groups, and
//! organizes them under schedulers (routines, waitlists, and randoms)
//! which decide at runtime which member fires next and when. Key events are
//! delivered through a pluggable [`KeyDriver`] sink.
//!
//! ## Quick start
//!
//! ```no_run
//! use beanscript::{parse_str, Runtime, TraceDriver};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let script = "\
//! key jump with button space, duration 40 60
//! key slide with button ctrl, cooldown 500
//! waitlist movement with jump, slide
//! start movement
//! ";
//!
//!     let program = parse_str(script)?;
//!     let mut runtime = Runtime::new(program, Box::new(TraceDriver));
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Script syntax
//!
//! One instruction per line, nesting by indentation (a tab counts as four
//! spaces):
//!
//! ```text
//! <kind> <id words…> [with <param>[, <param>]…]
//! ```
//!
//! | Kind | Description |
//! |------|-------------|
//! | `key <id>` | Define a named keystroke (`button`, timing parameters) |
//! | `press <id>` / `hold <id>` / `release <id>` | Fire a defined key, optionally overriding its parameters in place |
//! | `group <id>` | Compose members; runs them sequentially, `repeat -1` loops |
//! | `routine <id>` | Round-robin over its members |
//! | `waitlist <id>` | Fire every member whose cooldown elapsed, earliest first |
//! | `random <id>` | Fire one uniformly chosen eligible member |
//! | `start <id>` / `stop <id>` | Activate or deactivate a scheduler or group |
//! | `window <title>` | Focus a window before the script runs |
//! | `script <name>` | Name the script |
//! | `# comment` | Ignored, as are blank lines |
//!
//! Parameters are `button <keyname>` or `<name> <int> [<int>]` with name in
//! `duration`, `before`, `after`, `repeat`, `cooldown`; two integers give a
//! range sampled uniformly per firing. A bare id is a reference to an
//! already-defined instruction.
//!
//! ## Custom drivers
//!
//! By default events go to the logging [`TraceDriver`]. Implement
//! [`KeyDriver`] to inject into an OS-level backend, or use
//! [`RecordingDriver`] to capture events for inspection:
//!
//! ```no_run
//! use beanscript::{parse_str, RecordingDriver, Runtime};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let program = parse_str("key k with button a\npress k\n")?;
//!
//!     let driver = RecordingDriver::new();
//!     let events = driver.events();
//!
//!     let mut runtime = Runtime::new(program, Box::new(driver));
//!     runtime.run().await?;
//!
//!     for timed in events.lock().unwrap().iter() {
//!         println!("{:?}", timed.event);
//!     }
//!     Ok(())
//! }
//! ```

pub mod driver;
pub mod heap;
pub mod instruction;
pub mod keys;
pub mod params;
pub mod parser;
pub mod runtime;
mod schedulers;
pub mod table;

pub use driver::{
    default_driver, DriverEvent, DriverUnavailable, KeyDriver, RecordingDriver, TimedEvent,
    TraceDriver,
};
pub use instruction::{Instruction, Kind};
pub use keys::ScanCode;
pub use params::{Param, Range};
pub use parser::{parse_file, parse_str, Program};
pub use runtime::Runtime;
