pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zkfs")]
#[command(about = "Mount a ZooKeeper tree as a filesystem")]
pub struct Args {
    /// Path to the zkfs config directory (defaults to ~/.zkfs)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Backend, WriteMode};
    use crate::Command;

    #[test]
    fn test_parse_mount() {
        let args = Args::try_parse_from([
            "zkfs",
            "mount",
            "zk1:2181,zk2:2181",
            "/mnt/zk",
            "--root",
            "/apps",
            "--write-policy",
            "compare-and-set",
            "--backend",
            "memory",
        ])
        .unwrap();

        match args.command {
            Command::Mount(mount) => {
                assert_eq!(mount.connect, "zk1:2181,zk2:2181");
                assert_eq!(mount.mount_point, PathBuf::from("/mnt/zk"));
                assert_eq!(mount.root.as_deref(), Some("/apps"));
                assert_eq!(mount.write_policy, Some(WriteMode::CompareAndSet));
                assert_eq!(mount.backend, Some(Backend::Memory));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_mount_requires_both_positionals() {
        assert!(Args::try_parse_from(["zkfs", "mount", "localhost:2181"]).is_err());
        assert!(Args::try_parse_from(["zkfs", "mount"]).is_err());
    }

    #[test]
    fn test_global_config_path() {
        let args =
            Args::try_parse_from(["zkfs", "--config-path", "/etc/zkfs", "unmount", "/mnt/zk"])
                .unwrap();
        assert_eq!(args.config_path, Some(PathBuf::from("/etc/zkfs")));
        assert!(matches!(args.command, Command::Unmount(_)));
    }

    #[test]
    fn test_unknown_subcommand_rejected() {
        assert!(Args::try_parse_from(["zkfs", "rename", "/a", "/b"]).is_err());
    }
}
