//! Command-line interface
//!
//! Git runs the signing program with GnuPG-style flags, e.g.
//! `--status-fd=2 -bsau <key>` to sign and
//! `--status-fd=1 --keyid-format=long --verify <sig> -` to verify.

use crate::signature::IncludeCerts;
use clap::Parser;

/// Keyless git signing with Sigstore
#[derive(Debug, Clone, Parser)]
#[command(name = "gitsign", version, about, long_about = None)]
pub struct Cli {
    /// Make a signature
    #[arg(short = 's', long = "sign", conflicts_with = "verify")]
    pub sign: bool,

    /// Verify a signature
    #[arg(short = 'v', long = "verify")]
    pub verify: bool,

    /// Make a detached signature
    #[arg(short = 'b', long = "detach-sign")]
    pub detached: bool,

    /// Create ASCII armored output
    #[arg(short = 'a', long = "armor")]
    pub armor: bool,

    /// Key to sign with (ignored; the identity comes from OIDC)
    #[arg(short = 'u', long = "local-user", value_name = "USER-ID")]
    pub local_user: Option<String>,

    /// Write status lines to this file descriptor
    #[arg(long = "status-fd", value_name = "FD")]
    pub status_fd: Option<i32>,

    /// Key id format (accepted for compatibility)
    #[arg(long = "keyid-format", value_name = "FORMAT")]
    pub keyid_format: Option<String>,

    /// Certificates to include: -2 all but root, -1 all, 0 none, n the first n
    #[arg(
        long = "include-certs",
        value_name = "N",
        default_value_t = -2,
        allow_negative_numbers = true
    )]
    pub include_certs: i32,

    /// RFC 3161 timestamp authority URL
    #[arg(long = "timestamp-authority", value_name = "URL")]
    pub timestamp_authority: Option<String>,

    /// Files for the selected operation
    pub args: Vec<String>,
}

impl Cli {
    /// The certificate inclusion policy
    pub fn include_certs(&self) -> IncludeCerts {
        IncludeCerts::from(self.include_certs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_git_sign_invocation() {
        let cli = Cli::try_parse_from(["gitsign", "--status-fd=2", "-bsau", "ABCDEF0123"]).unwrap();
        assert!(cli.sign);
        assert!(cli.detached);
        assert!(cli.armor);
        assert!(!cli.verify);
        assert_eq!(cli.local_user.as_deref(), Some("ABCDEF0123"));
        assert_eq!(cli.status_fd, Some(2));
        assert_eq!(cli.include_certs(), IncludeCerts::ALL_BUT_ROOT);
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_git_verify_invocation() {
        let cli = Cli::try_parse_from([
            "gitsign",
            "--status-fd=1",
            "--keyid-format=long",
            "--verify",
            "/tmp/.git_vtag_tmp123",
            "-",
        ])
        .unwrap();
        assert!(cli.verify);
        assert!(!cli.sign);
        assert_eq!(cli.status_fd, Some(1));
        assert_eq!(cli.args, vec!["/tmp/.git_vtag_tmp123", "-"]);
    }

    #[test]
    fn test_sign_and_verify_conflict() {
        assert!(Cli::try_parse_from(["gitsign", "-s", "-v"]).is_err());
    }

    #[test]
    fn test_include_certs_negative() {
        let cli = Cli::try_parse_from(["gitsign", "-s", "--include-certs", "-1"]).unwrap();
        assert_eq!(cli.include_certs(), IncludeCerts::ALL);
    }

    #[test]
    fn test_no_mode() {
        let cli = Cli::try_parse_from(["gitsign"]).unwrap();
        assert!(!cli.sign && !cli.verify);
    }
}
