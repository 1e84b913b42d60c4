//! Property-based tests for the upload state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use proptest::prelude::*;
use std::path::Path;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_file_name() -> impl Strategy<Value = String> {
    ("[a-z]{1,12}", prop_oneof![Just("pdf"), Just("PDF"), Just("txt"), Just("docx")])
        .prop_map(|(stem, ext)| format!("{stem}.{ext}"))
}

fn arb_source() -> impl Strategy<Value = FileSource> {
    prop_oneof![Just(FileSource::Picker), Just(FileSource::Drop)]
}

fn arb_selected_file() -> impl Strategy<Value = SelectedFile> {
    "[a-z]{1,12}".prop_map(|stem| {
        let name = format!("{stem}.pdf");
        SelectedFile {
            path: Path::new("/tmp").join(&name),
            name,
        }
    })
}

fn arb_event() -> impl Strategy<Value = UploadEvent> {
    prop_oneof![
        (arb_file_name(), arb_source()).prop_map(|(name, source)| UploadEvent::FileChosen {
            candidate: FileCandidate::from_path(&Path::new("/tmp").join(name)),
            source,
        }),
        Just(UploadEvent::UploadRequested),
        any::<u8>().prop_map(|percent| UploadEvent::TransferProgress { percent }),
        proptest::option::of("[a-z0-9]{4,8}")
            .prop_map(|job_id| UploadEvent::UploadAccepted { job_id }),
        Just(UploadEvent::ProcessingComplete),
        "[a-zA-Z ]{1,30}".prop_map(|reason| UploadEvent::UploadFailed { reason }),
    ]
}

fn arb_busy_state() -> impl Strategy<Value = UploadState> {
    prop_oneof![
        (arb_selected_file(), 0u8..=100)
            .prop_map(|(file, progress)| UploadState::Transmitting { file, progress }),
        (arb_selected_file(), proptest::option::of("[a-z0-9]{4,8}"))
            .prop_map(|(file, job_id)| UploadState::ServerProcessing { file, job_id }),
    ]
}

fn arb_state() -> impl Strategy<Value = UploadState> {
    prop_oneof![
        Just(UploadState::Idle),
        arb_selected_file().prop_map(|file| UploadState::FileSelected { file }),
        arb_busy_state(),
    ]
}

fn is_valid_state(state: &UploadState) -> bool {
    match state {
        UploadState::Idle => true,
        UploadState::FileSelected { file } | UploadState::ServerProcessing { file, .. } => {
            FileCandidate::from_path(&file.path).is_pdf()
        }
        UploadState::Transmitting { file, progress } => {
            *progress <= 100 && FileCandidate::from_path(&file.path).is_pdf()
        }
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Any event sequence leaves the machine in a valid state
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..30)) {
        let mut state = UploadState::Idle;

        for event in events {
            if let Ok(result) = transition(&state, event) {
                state = result.new_state;
                prop_assert!(is_valid_state(&state), "Invalid state: {:?}", state);
            }
        }
    }

    // Progress only moves forward within one transfer
    #[test]
    fn prop_progress_is_monotonic(
        file in arb_selected_file(),
        updates in proptest::collection::vec(any::<u8>(), 1..20)
    ) {
        let mut state = UploadState::Transmitting { file, progress: 0 };
        let mut last = 0u8;

        for percent in updates {
            let result = transition(&state, UploadEvent::TransferProgress { percent }).unwrap();
            let progress = result.new_state.progress().unwrap();
            prop_assert!(progress >= last);
            prop_assert!(progress <= 100);
            last = progress;
            state = result.new_state;
        }
    }

    // Busy states refuse a second file or upload
    #[test]
    fn prop_busy_rejects_new_uploads(state in arb_busy_state(), name in arb_file_name(), source in arb_source()) {
        prop_assert_eq!(
            transition(&state, UploadEvent::UploadRequested).unwrap_err(),
            TransitionError::UploadBusy
        );
        let chosen = UploadEvent::FileChosen {
            candidate: FileCandidate::from_path(&Path::new("/tmp").join(name)),
            source,
        };
        prop_assert_eq!(transition(&state, chosen).unwrap_err(), TransitionError::UploadBusy);
    }

    // Failure always lands in Idle with exactly one destructive notification
    #[test]
    fn prop_failure_goes_idle(state in arb_busy_state(), reason in "[a-zA-Z ]{1,30}") {
        let result = transition(&state, UploadEvent::UploadFailed { reason }).unwrap();
        prop_assert_eq!(&result.new_state, &UploadState::Idle);
        prop_assert_eq!(result.effects.len(), 1);
        prop_assert!(matches!(&result.effects[0], Effect::Notify(n) if n.is_destructive()));
    }

    // Only a successful completion appends a message, and only one
    #[test]
    fn prop_only_completion_appends_message(state in arb_state(), event in arb_event()) {
        let completing = matches!(state, UploadState::ServerProcessing { .. })
            && matches!(event, UploadEvent::ProcessingComplete);

        if let Ok(result) = transition(&state, event) {
            let appended = result
                .effects
                .iter()
                .filter(|e| matches!(e, Effect::AppendAiMessage { .. }))
                .count();
            prop_assert_eq!(appended, usize::from(completing));
        }
    }

    // Transmission can only start from a selected file
    #[test]
    fn prop_transmit_requires_selection(state in arb_state(), event in arb_event()) {
        let was_selected = matches!(state, UploadState::FileSelected { .. });
        if let Ok(result) = transition(&state, event) {
            let transmits = result.effects.iter().any(|e| matches!(e, Effect::TransmitFile { .. }));
            prop_assert!(!transmits || was_selected);
        }
    }

    // Idle is reachable from every state
    #[test]
    fn prop_idle_reachable(state in arb_state()) {
        let event = if state.is_busy() {
            UploadEvent::UploadFailed { reason: "boom".to_string() }
        } else {
            UploadEvent::FileChosen {
                candidate: FileCandidate::from_path(Path::new("/tmp/notes.txt")),
                source: FileSource::Picker,
            }
        };
        let result = transition(&state, event).unwrap();
        prop_assert_eq!(result.new_state, UploadState::Idle);
    }
}
