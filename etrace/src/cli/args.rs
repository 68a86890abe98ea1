//! CLI argument definitions

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::analysis::DEFAULT_TOP;

#[derive(Parser, Debug)]
#[command(
    name = "etrace",
    version,
    about = "Step through and profile instruction traces from a hardware simulator",
    after_help = "\
EXAMPLES:
    etrace view --trace run.etrace --elf firmware.elf     Step through with source
    etrace view --trace run.etrace --dwarf --elf fw.elf   Use in-process DWARF lookup
    etrace profile run.etrace nm.txt --top 10            Ten hottest functions"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive step-through viewer
    View(ViewArgs),
    /// Hot-function report from an `nm` symbol listing
    Profile(ProfileArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ViewArgs {
    /// Trace file to open
    #[arg(short, long, value_name = "FILE")]
    pub trace: Option<PathBuf>,

    /// Executable image for symbol and source lookup
    #[arg(short, long, value_name = "FILE")]
    pub elf: Option<PathBuf>,

    /// Directory that relative source paths are resolved against
    #[arg(long, value_name = "DIR")]
    pub comp_dir: Option<PathBuf>,

    /// JSON configuration file (address map, defaults)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Symbolizer program to spawn per address
    #[arg(long, value_name = "PROG")]
    pub addr2line: Option<String>,

    /// Read DWARF in-process instead of spawning addr2line
    #[arg(long, requires = "elf")]
    pub dwarf: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ProfileArgs {
    /// Trace file to scan
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// `nm` output for the traced executable
    #[arg(value_name = "NM")]
    pub nm: PathBuf,

    /// Number of functions to list
    #[arg(long, default_value_t = DEFAULT_TOP)]
    pub top: usize,

    /// Also write the report as JSON
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_args() {
        let args = Args::try_parse_from([
            "etrace", "view", "--trace", "t.bin", "--elf", "fw.elf", "--dwarf", "--comp-dir", "/src",
        ])
        .unwrap();
        let Command::View(view) = args.command else { panic!("expected view") };
        assert_eq!(view.trace, Some(PathBuf::from("t.bin")));
        assert!(view.dwarf);
        assert_eq!(view.comp_dir, Some(PathBuf::from("/src")));
        assert!(view.addr2line.is_none());
    }

    #[test]
    fn test_dwarf_requires_elf() {
        assert!(Args::try_parse_from(["etrace", "view", "--trace", "t.bin", "--dwarf"]).is_err());
    }

    #[test]
    fn test_profile_args_default_top() {
        let args = Args::try_parse_from(["etrace", "profile", "t.bin", "nm.txt"]).unwrap();
        let Command::Profile(profile) = args.command else { panic!("expected profile") };
        assert_eq!(profile.top, 30);
        assert!(profile.json.is_none());

        assert!(Args::try_parse_from(["etrace", "profile", "t.bin"]).is_err());
    }

    #[test]
    fn test_cli_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
