use crate::mods::{ModMetadata, ModWarning};
use crate::monitor::{LogLevel, LoggedMessages, Monitor};
use crate::services::handlers::{HandleResult, InstructionHandler};

/// Message template and warning flag for a result kind. `$phrase` is substituted later.
fn template(result: HandleResult, filename: &str) -> Option<(String, Option<ModWarning>)> {
    let entry = match result {
        HandleResult::Rewritten => (format!("Rewrote {filename} to fix $phrase..."), None),
        HandleResult::NotCompatible => {
            (format!("Broken code in {filename}: $phrase."), Some(ModWarning::BROKEN_CODE_LOADED))
        }
        HandleResult::DetectedGamePatch => (
            format!("Detected game patcher ($phrase) in assembly {filename}."),
            Some(ModWarning::PATCHES_GAME),
        ),
        HandleResult::DetectedSaveSerializerChange => (
            format!("Detected possible save serializer change ($phrase) in assembly {filename}."),
            Some(ModWarning::CHANGES_SAVE_SERIALIZER),
        ),
        HandleResult::DetectedUnvalidatedUpdateTick => (
            format!("Detected reference to $phrase in assembly {filename}."),
            Some(ModWarning::USES_UNVALIDATED_UPDATE_TICK),
        ),
        HandleResult::DetectedDynamicUse => (
            format!("Detected 'dynamic' keyword ($phrase) in assembly {filename}."),
            Some(ModWarning::USES_DYNAMIC),
        ),
        HandleResult::DetectedConsoleAccess => (
            format!("Detected direct console access ($phrase) in assembly {filename}."),
            Some(ModWarning::ACCESSES_CONSOLE),
        ),
        HandleResult::DetectedFilesystemAccess => (
            format!("Detected filesystem access ($phrase) in assembly {filename}."),
            Some(ModWarning::ACCESSES_FILESYSTEM),
        ),
        HandleResult::DetectedShellAccess => (
            format!("Detected shell or process access ($phrase) in assembly {filename}."),
            Some(ModWarning::ACCESSES_SHELL),
        ),
        HandleResult::None => return None,
    };
    Some(entry)
}

/// Turn one handler's findings into warning flags and deduplicated log lines.
///
/// Returns the messages produced for `NotCompatible` findings, which the
/// caller uses when rejecting the load.
pub fn process_handler_results(
    meta: &mut ModMetadata,
    handler: &dyn InstructionHandler,
    monitor: &dyn Monitor,
    logged: &mut LoggedMessages,
    filename: &str,
) -> Vec<String> {
    let findings = handler.findings();
    let mut incompatibilities = Vec::new();

    for &result in &findings.flags {
        let Some((template, warning)) = template(result, filename) else {
            continue;
        };
        if let Some(warning) = warning {
            meta.set_warning(warning);
        }

        let messages: Vec<String> = if findings.phrases.is_empty() {
            let phrase = handler.default_phrase().unwrap_or_else(|| handler.name());
            vec![template.replace("$phrase", phrase)]
        } else {
            findings.phrases.iter().map(|phrase| template.replace("$phrase", phrase)).collect()
        };

        for message in messages {
            monitor.log_once(logged, &message, LogLevel::Trace);
            if result == HandleResult::NotCompatible {
                incompatibilities.push(message);
            }
        }
    }

    incompatibilities
}
