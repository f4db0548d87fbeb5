//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝


#[cfg(test)]
mod passing {
    use assert_cmd::prelude::*;
    use std::process::Command;

    #[test]
    fn print_help_information() {
        let out = Command::cargo_bin(env!("CARGO_PKG_NAME"))
            .unwrap()
            .arg("--help")
            .output()
            .unwrap();

        let stdout = String::from_utf8_lossy(&out.stdout);
        assert!(out.status.success());
        assert!(stdout.contains("--library-url"));
        assert!(stdout.contains("--skip-unsupported-pages"));
        assert!(stdout.contains("MINDTOUCH_OUTPUT"));
    }

    #[test]
    fn print_version() {
        let out = Command::cargo_bin(env!("CARGO_PKG_NAME"))
            .unwrap()
            .arg("--version")
            .output()
            .unwrap();

        assert!(out.status.success());
        assert_eq!(
            String::from_utf8_lossy(&out.stdout),
            format!("{} {}\n", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        );
    }
}

//  ███████╗ █████╗ ██╗██╗     ██╗███╗   ██╗ ██████╗
//  ██╔════╝██╔══██╗██║██║     ██║████╗  ██║██╔════╝
//  █████╗  ███████║██║██║     ██║██╔██╗ ██║██║  ███╗
//  ██╔══╝  ██╔══██║██║██║     ██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║██║███████╗██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚═╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝

#[cfg(test)]
mod failing {
    use assert_cmd::prelude::*;
    use std::path::Path;
    use std::process::Command;

    fn scraper(output: &Path, title: &str) -> Command {
        let mut cmd = Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap();
        cmd.args([
            "--library-url",
            "http://localhost:1/",
            "--creator",
            "Acme",
            "--name",
            "acme",
            "--title",
            title,
            "--description",
            "All of Acme",
        ])
        .arg("--output")
        .arg(output.join("out"))
        .arg("--tmp")
        .arg(output.join("tmp"));
        cmd
    }

    #[test]
    fn missing_library_url() {
        let out = Command::cargo_bin(env!("CARGO_PKG_NAME"))
            .unwrap()
            .args(["--name", "acme"])
            .output()
            .unwrap();

        assert!(!out.status.success());
        assert!(String::from_utf8_lossy(&out.stderr).contains("--library-url"));
    }

    #[test]
    fn invalid_bad_assets_regex_fails_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let out = scraper(dir.path(), "Acme library")
            .args(["--bad-assets-regex", "("])
            .output()
            .unwrap();

        assert_eq!(out.status.code(), Some(2));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn title_too_long() {
        let dir = tempfile::tempdir().unwrap();
        let out = scraper(dir.path(), "A title that is way longer than thirty characters")
            .output()
            .unwrap();

        assert_eq!(out.status.code(), Some(2));
    }

    #[test]
    fn unknown_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let out = scraper(dir.path(), "Acme library")
            .args(["--file-name", "{name}_{unknown}"])
            .output()
            .unwrap();

        assert_eq!(out.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&out.stdout).contains("Invalid placeholder"));
    }

    #[test]
    fn existing_output_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("out").join("acme_archive");
        std::fs::create_dir_all(&existing).unwrap();

        let out = scraper(dir.path(), "Acme library")
            .args(["--file-name", "{name}_archive"])
            .output()
            .unwrap();

        assert_eq!(out.status.code(), Some(2));
        assert!(existing.is_dir());
    }
}
