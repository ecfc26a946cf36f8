//! Remediation hints for failed commands

use unblock_config::ConfigError;
use unblock_deps::ErrorKind;

/// A suggestion for the first library error found in `error`'s chain
pub fn hint_for(error: &anyhow::Error) -> Option<&'static str> {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<unblock_deps::Error>() {
            return Some(hint_for_kind(e.kind()));
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return Some(hint_for_kind(ErrorKind::Config));
        }
    }
    None
}

/// The suggestion shown for each error kind
pub fn hint_for_kind(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::MalformedInput => {
            "package.json or package-lock.json is not valid; \
             regenerate the lockfile with `npm install`"
        }
        ErrorKind::FileAccess => {
            "run inside an npm project (or pass --project) \
             that has both package.json and package-lock.json"
        }
        ErrorKind::Resolution => {
            "the registry could not be reached; \
             check your network or [registry] url in unblock.toml"
        }
        ErrorKind::Validation => "fix the reported problems and run the command again",
        ErrorKind::Apply => {
            "check the package manager output above; \
             the backup can be restored with `unblock restore`"
        }
        ErrorKind::Restore => "the backup is damaged; pick another one from `unblock backups list`",
        ErrorKind::Config => "check unblock.toml, or recreate it with `unblock config init`",
    }
}
