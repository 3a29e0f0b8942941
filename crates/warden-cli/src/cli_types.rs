use clap::ValueEnum;
use warden_github::trigger::PhraseMatchMode;
use warden_runtime::PermissionPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliPhraseMatchMode {
    CaseSensitive,
    CaseInsensitive,
}

impl From<CliPhraseMatchMode> for PhraseMatchMode {
    fn from(value: CliPhraseMatchMode) -> Self {
        match value {
            CliPhraseMatchMode::CaseSensitive => PhraseMatchMode::CaseSensitive,
            CliPhraseMatchMode::CaseInsensitive => PhraseMatchMode::CaseInsensitive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliPermissionPolicy {
    Trusted,
    WriteAccess,
}

impl From<CliPermissionPolicy> for PermissionPolicy {
    fn from(value: CliPermissionPolicy) -> Self {
        match value {
            CliPermissionPolicy::Trusted => PermissionPolicy::Trusted,
            CliPermissionPolicy::WriteAccess => PermissionPolicy::WriteAccess,
        }
    }
}
