//! Driver integration tests
//!
//! Full invocations through the driver against in-memory or temporary
//! profile stores, with captured output and scripted debuggers.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use tether::postmortem::Debugger;
use tether::{
    CliContext, CliError, Console, Crash, DefaultConnector, Driver, FileStore, MemoryStore,
    OpenStore, Profile, ProfileStore,
};

/// Debugger that records what it was handed
struct Recorder {
    available: bool,
    seen: Rc<RefCell<Vec<String>>>,
}

impl Debugger for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn available(&self, _console: &Console) -> bool {
        self.available
    }

    fn post_mortem(&self, crash: &Crash, _console: &Console) -> io::Result<()> {
        self.seen.borrow_mut().push(crash.error().to_string());
        Ok(())
    }
}

struct Run {
    code: u8,
    out: String,
    err: String,
    inspected: Vec<String>,
}

struct Harness {
    store: Rc<dyn OpenStore>,
    stdin_tty: bool,
    stdout_tty: bool,
    debugger_available: bool,
}

impl Harness {
    fn new(store: Rc<dyn OpenStore>) -> Self {
        Self {
            store,
            stdin_tty: false,
            stdout_tty: false,
            debugger_available: true,
        }
    }

    fn interactive(mut self) -> Self {
        self.stdin_tty = true;
        self.stdout_tty = true;
        self
    }

    fn run(&self, args: &[&str]) -> Run {
        let (console, out, err) = Console::captured(self.stdin_tty, self.stdout_tty);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder {
            available: self.debugger_available,
            seen: seen.clone(),
        };
        let store = self.store.clone();
        let stdout_tty = self.stdout_tty;
        let code = Driver::new("tether", &console)
            .with_debuggers(vec![Box::new(recorder)])
            .run(args.iter().copied(), move || {
                CliContext::load(store, Rc::new(DefaultConnector), stdout_tty)
            });
        let inspected = seen.borrow().clone();
        Run {
            code,
            out: out.contents(),
            err: err.contents(),
            inspected,
        }
    }
}

/// Profiles `a` and `b`, plus one whose URL cannot produce a session
fn profiles(default: Option<&str>) -> Rc<dyn OpenStore> {
    let store = ProfileStore::in_memory(
        [
            Profile::new("a", "http://a.example/MAAS/", "ck:tk:ts"),
            Profile::new("b", "http://b.example/MAAS/", ""),
            Profile::new("broken", "ftp://broken.example/", ""),
        ],
        default,
    )
    .unwrap();
    Rc::new(MemoryStore::new(store))
}

// =============================================================================
// Parsing and tree
// =============================================================================

mod parsing_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_help_lists_commands_and_hides_debug() {
        let run = Harness::new(profiles(Some("a"))).run(&["--help"]);
        assert_eq!(run.code, 0);
        assert!(run.out.contains("drill down"));
        assert!(run.out.contains("list-profiles"));
        assert!(run.out.contains("acquire"));
        assert!(!run.out.contains("--debug"));
    }

    #[test]
    fn test_version() {
        let run = Harness::new(profiles(None)).run(&["--version"]);
        assert_eq!(run.code, 0);
        assert!(run.out.contains(tether::VERSION));
    }

    #[test]
    fn test_verb_alone_is_argument_missing() {
        let run = Harness::new(profiles(Some("a"))).run(&["list"]);
        assert_eq!(run.code, 2);
        assert!(run.err.contains("Error: Argument missing."));
        assert!(run.err.contains("profiles"));
    }

    #[test]
    fn test_no_arguments_is_argument_missing() {
        let run = Harness::new(profiles(Some("a"))).run(&[]);
        assert_eq!(run.code, 2);
        assert!(run.err.contains("Argument missing."));
    }

    #[test]
    fn test_unknown_option_reports_through_node() {
        let run = Harness::new(profiles(Some("a"))).run(&["list", "profiles", "--bogus"]);
        assert_eq!(run.code, 2);
        assert!(run.err.contains("Error: unexpected argument '--bogus'"));
        assert!(run.err.contains("tether list profiles"));
    }
}

// =============================================================================
// Profile selection
// =============================================================================

mod profile_selection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_profile_is_used() {
        let run = Harness::new(profiles(Some("a"))).run(&["show-profile"]);
        assert_eq!(run.code, 0, "{}", run.err);
        assert!(run.out.contains("http://a.example/MAAS/api/2.0/"));
        assert!(run.out.contains("+"));
    }

    #[test]
    fn test_explicit_profile_wins() {
        let run = Harness::new(profiles(Some("a"))).run(&["show-profile", "--profile-name", "b"]);
        assert_eq!(run.code, 0, "{}", run.err);
        assert!(run.out.contains("http://b.example/MAAS/api/2.0/"));
        assert!(run.out.contains("anonymous"));
    }

    #[test]
    fn test_profile_required_without_default() {
        let run = Harness::new(profiles(None)).run(&["whoami"]);
        assert_eq!(run.code, 2);
        assert!(run.err.contains("--profile-name"));
        assert!(run.err.contains("Error:"));
    }

    #[test]
    fn test_unknown_profile_is_rejected_by_parser() {
        let run = Harness::new(profiles(Some("a"))).run(&["whoami", "--profile-name", "c"]);
        assert_eq!(run.code, 2);
        assert!(run.err.contains("invalid value 'c'"));
    }

    #[test]
    fn test_output_format_follows_terminal() {
        let mut harness = Harness::new(profiles(Some("a")));
        harness.stdout_tty = true;
        let run = harness.run(&["show-profile"]);
        assert_eq!(run.code, 0, "{}", run.err);
        assert!(run.out.contains('┌'));

        let run = Harness::new(profiles(Some("a"))).run(&["show-profile", "--output-format", "yaml"]);
        assert!(run.out.contains("key: name"));
    }
}

// =============================================================================
// Failure escalation
// =============================================================================

mod escalation_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_command_failure_is_terse() {
        let run = Harness::new(profiles(Some("a"))).run(&["whoami", "--profile-name", "broken"]);
        assert_eq!(run.code, 2);
        assert!(run.err.contains("Error: invalid server URL"));
        assert!(run.err.contains("Usage:"));
        assert!(run.inspected.is_empty());
    }

    #[test]
    fn test_interactive_failure_without_debug_is_still_terse() {
        let run = Harness::new(profiles(Some("a")))
            .interactive()
            .run(&["whoami", "--profile-name", "broken"]);
        assert_eq!(run.code, 2);
        assert!(run.inspected.is_empty());
    }

    #[test]
    fn test_debug_dumps_trace_when_not_interactive() {
        let run = Harness::new(profiles(Some("a"))).run(&["whoami", "--profile-name", "broken", "--debug"]);
        assert_eq!(run.code, 1);
        assert!(run.err.starts_with("Error: invalid server URL"));
        assert!(!run.err.contains("Usage:"));
        assert!(run.inspected.is_empty());
    }

    #[test]
    fn test_command_usage_error_uses_its_own_node() {
        let run = Harness::new(profiles(Some("a"))).run(&["--debug", "remove-profile", "ghost"]);
        assert_eq!(run.code, 2);
        assert!(run.err.contains("Usage: tether remove-profile"));
        assert!(run.err.contains("Error: no such profile: ghost"));
        assert!(!run.err.contains("Stack backtrace"));
        assert!(run.inspected.is_empty());
    }

    #[test]
    fn test_debug_trace_carries_backtrace() {
        // Traces must not depend on the environment asking for them.
        std::env::remove_var("RUST_BACKTRACE");
        std::env::remove_var("RUST_LIB_BACKTRACE");
        let run = Harness::new(profiles(Some("a"))).run(&["--debug", "whoami", "--profile-name", "broken"]);
        assert_eq!(run.code, 1);
        assert!(run.err.starts_with("Error: invalid server URL"));
        assert!(run.err.contains("Stack backtrace"), "{}", run.err);
    }

    #[test]
    fn test_debug_enters_post_mortem_when_interactive() {
        let run = Harness::new(profiles(Some("a")))
            .interactive()
            .run(&["--debug", "whoami", "--profile-name", "broken"]);
        assert_eq!(run.code, 1);
        assert_eq!(run.inspected.len(), 1);
        assert!(run.inspected[0].contains("invalid server URL"));
        assert!(run.err.contains(" CRASH! "));
    }

    #[test]
    fn test_debug_falls_back_to_trace_without_debugger() {
        let mut harness = Harness::new(profiles(Some("a"))).interactive();
        harness.debugger_available = false;
        let run = harness.run(&["--debug", "whoami", "--profile-name", "broken"]);
        assert_eq!(run.code, 1);
        assert!(run.err.contains("Error: invalid server URL"));
        assert!(!run.err.contains(" CRASH! "));
    }

    #[test]
    fn test_load_failure_is_shown_in_full() {
        let (console, _, err) = Console::captured(false, false);
        let code = Driver::new("tether", &console).run(["whoami"], || {
            Err(CliError::InvalidStore {
                path: "/nowhere/profiles.json".into(),
                reason: "expected value".into(),
            })
        });
        assert_eq!(code, 1);
        assert!(err.contents().contains("invalid profile store"));
    }

    #[test]
    fn test_interrupt_exits_one_without_debugger() {
        let (console, _, err) = Console::captured(true, true);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder {
            available: true,
            seen: seen.clone(),
        };
        let code = Driver::new("tether", &console)
            .with_debuggers(vec![Box::new(recorder)])
            .run(["--debug", "whoami"], || Err(CliError::Interrupted));
        assert_eq!(code, 1);
        assert!(seen.borrow().is_empty());
        assert!(!err.contents().contains(" CRASH! "));
    }

    #[test]
    fn test_stray_eintr_is_reported() {
        let (console, _, err) = Console::captured(false, false);
        let code = Driver::new("tether", &console).run(["whoami"], || {
            Err(CliError::Io(io::Error::new(io::ErrorKind::Interrupted, "EINTR")))
        });
        assert_eq!(code, 1);
        assert!(err.contents().contains("EINTR"));
    }

    #[test]
    fn test_panic_is_caught() {
        let (console, _, err) = Console::captured(false, false);
        let code = Driver::new("tether", &console)
            .run(["whoami"], || -> tether::Result<CliContext> { panic!("store exploded") });
        assert_eq!(code, 1);
        assert!(err.contents().contains("store exploded"));
    }
}

// =============================================================================
// Profile management round trip
// =============================================================================

mod profile_store_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_then_list() {
        let dir = TempDir::new().unwrap();
        let store: Rc<dyn OpenStore> = Rc::new(FileStore::new(dir.path().join("profiles.json")));
        let harness = Harness::new(store.clone());

        let run = harness.run(&["add-profile", "lab", "http://lab.example/MAAS/", "--api-key", "c:t:s"]);
        assert_eq!(run.code, 0, "{}", run.err);

        let run = harness.run(&["list", "profiles"]);
        assert_eq!(run.code, 0, "{}", run.err);
        assert!(run.out.contains("| lab"));
        assert!(run.out.contains("yes"));

        // The new profile is a valid choice for the next invocation.
        let run = harness.run(&["whoami", "--profile-name", "lab"]);
        assert_eq!(run.code, 0, "{}", run.err);
        assert!(run.out.contains("consumer key c"));
    }

    #[test]
    fn test_duplicate_profile_needs_replace() {
        let dir = TempDir::new().unwrap();
        let store: Rc<dyn OpenStore> = Rc::new(FileStore::new(dir.path().join("profiles.json")));
        let harness = Harness::new(store.clone());

        harness.run(&["add-profile", "lab", "http://one.example/"]);
        let run = harness.run(&["add-profile", "lab", "http://two.example/"]);
        assert_eq!(run.code, 2);
        assert!(run.err.contains("duplicate profile: lab"));

        let run = harness.run(&["add-profile", "lab", "http://two.example/", "--replace"]);
        assert_eq!(run.code, 0);
        let saved = store.open().unwrap();
        assert_eq!(saved.get("lab").map(|p| p.url.as_str()), Some("http://two.example/"));
    }
}
