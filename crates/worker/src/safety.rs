// SPDX-License-Identifier: MIT

//! The command-safety gate applied to every `@cmd:` payload before local
//! execution. Blocklist wins on any substring hit; otherwise the command
//! must match an allowlist prefix (or begin with `./`).

/// Substring match, reject on any hit.
const BLOCKLIST: &[&str] =
    &["rm -rf /", "rm -rf ~", "sudo ", "curl ", "wget ", "eval ", "> /dev/", "mkfs", "dd if=", ":(){ "];

/// Prefix match, accept on any hit.
const ALLOWLIST: &[&str] = &[
    "echo ", "cat ", "test ", "ls ", "mkdir ", "cp ", "mv ",
    "go test", "go build", "go vet", "go fmt",
    "python", "pip ", "npm ", "npx ", "node ",
    "make", "cargo ", "rustc ",
    "git ", "diff ", "patch ",
    "swift ", "xcodebuild",
    "./code ", "./scripts/code",
    "true", "false",
    "touch ", "rm ",
    "head ", "tail ", "wc ", "sort ", "uniq ",
    "grep ", "rg ", "fd ",
    "sha1sum", "sha256sum", "md5sum",
    "sleep ",
];

/// Blocklist first (reject wins), then allowlist, then the `./` escape
/// hatch for repo-local scripts. A command matching none of the three is
/// rejected.
pub fn is_cmd_safe(cmd: &str) -> bool {
    let cmd = cmd.trim();
    if BLOCKLIST.iter().any(|blocked| cmd.contains(blocked)) {
        return false;
    }
    if ALLOWLIST.iter().any(|prefix| cmd.starts_with(prefix) || cmd == prefix.trim()) {
        return true;
    }
    cmd.starts_with("./")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_rejects_regardless_of_allowlist_prefix() {
        assert!(!is_cmd_safe("echo hi && sudo rm -rf /"));
        assert!(!is_cmd_safe("cargo build && curl http://evil"));
    }

    #[test]
    fn allowlist_accepts_known_prefixes() {
        assert!(is_cmd_safe("echo hello"));
        assert!(is_cmd_safe("cargo test --workspace"));
        assert!(is_cmd_safe("git status"));
        assert!(is_cmd_safe("go test ./..."));
    }

    #[test]
    fn bare_allowlisted_command_without_trailing_space_is_accepted() {
        assert!(is_cmd_safe("true"));
        assert!(is_cmd_safe("false"));
    }

    #[test]
    fn dot_slash_escape_hatch_permits_repo_local_scripts() {
        assert!(is_cmd_safe("./deploy.sh --staging"));
    }

    #[test]
    fn unrecognized_command_is_rejected() {
        assert!(!is_cmd_safe("perl -e 'something'"));
    }

    #[test]
    fn fork_bomb_pattern_is_blocked() {
        assert!(!is_cmd_safe(":(){ :|:& };:"));
    }
}
