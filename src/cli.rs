use clap::{Parser, Subcommand};
use std::path::PathBuf;

use sosdisk::image::SectorOrder;

#[derive(Parser, Debug)]
#[command(
    name = "sosdisk",
    about = "List the directory tree of an Apple SOS/ProDOS disk image",
    long_about = "Decode the volume directory of an Apple III SOS or Apple II ProDOS disk image and list its files, reporting every structural problem found along the way"
)]
pub struct Args {
    /// Image is in DOS 3.3 sector order (140K floppies only)
    #[arg(long = "do", conflicts_with = "prodos_order")]
    pub dos_order: bool,

    /// Image is in SOS/ProDOS block order
    #[arg(long = "po")]
    pub prodos_order: bool,

    /// Disk image file
    pub image: PathBuf,

    /// Verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List files on the volume
    Ls {
        /// Descend into subdirectories
        #[arg(short = 'r', long = "recursive")]
        recursive: bool,

        /// Show date, type, attributes and size
        #[arg(short = 'l', long = "long")]
        long: bool,

        /// Print the decoded tree as JSON
        #[arg(long = "json", conflicts_with_all = ["recursive", "long"])]
        json: bool,
    },
}

impl Args {
    /// Sector order forced on the command line, if any.
    pub fn sector_order(&self) -> Option<SectorOrder> {
        if self.dos_order {
            Some(SectorOrder::Dos)
        } else if self.prodos_order {
            Some(SectorOrder::ProDos)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_ls() {
        let args = Args::parse_from(["sosdisk", "--do", "disk.dsk", "ls", "-r", "-l"]);
        assert_eq!(args.sector_order(), Some(SectorOrder::Dos));
        assert_eq!(args.image, PathBuf::from("disk.dsk"));
        assert!(matches!(
            args.command,
            Command::Ls {
                recursive: true,
                long: true,
                json: false
            }
        ));
    }

    #[test]
    fn test_order_flags_conflict() {
        assert!(Args::try_parse_from(["sosdisk", "--do", "--po", "x.po", "ls"]).is_err());
        let args = Args::parse_from(["sosdisk", "x.img", "ls"]);
        assert_eq!(args.sector_order(), None);
    }
}
