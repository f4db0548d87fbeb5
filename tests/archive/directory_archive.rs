//  ██████╗  █████╗ ███████╗███████╗██╗███╗   ██╗ ██████╗
//  ██╔══██╗██╔══██╗██╔════╝██╔════╝██║████╗  ██║██╔════╝
//  ██████╔╝███████║███████╗███████╗██║██╔██╗ ██║██║  ███╗
//  ██╔═══╝ ██╔══██║╚════██║╚════██║██║██║╚██╗██║██║   ██║
//  ██║     ██║  ██║███████║███████║██║██║ ╚████║╚██████╔╝
//  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚═╝╚═╝  ╚═══╝ ╚═════╝


#[cfg(test)]
mod passing {
    use std::fs;

    use mindtouch2zim::archive::{ArchiveItem, ArchiveMetadata, ArchiveWriter, DirectoryArchive, IndexHint};
    use mindtouch2zim::processor::page_redirect_html;

    fn read_json(path: &std::path::Path) -> serde_json::Value {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn page_index_items() {
        let output = tempfile::tempdir().unwrap();
        let mut archive = DirectoryArchive::create(output.path(), "geo_2024-10", "index.html").unwrap();

        archive
            .add_item(
                ArchiveItem::bytes("index.html", "<title>Geosciences</title>")
                    .with_mimetype("text/html")
                    .with_title("Geosciences")
                    .front(),
            )
            .unwrap();
        archive
            .add_item(
                ArchiveItem::bytes("index/page_25", page_redirect_html("1: First topic", "Topic_1"))
                    .with_mimetype("text/html")
                    .with_title("1: First topic")
                    .with_index(IndexHint {
                        title: "1: First topic".to_string(),
                        content: "Rocks and minerals".to_string(),
                    }),
            )
            .unwrap();
        archive
            .configure_metadata(ArchiveMetadata {
                name: "geo".to_string(),
                title: "Geosciences".to_string(),
                language: "eng".to_string(),
                tags: vec!["mindtouch".to_string(), "geo".to_string()],
                ..Default::default()
            })
            .unwrap();

        let destination = archive.finish().unwrap();
        assert_eq!(destination, output.path().join("geo_2024-10"));

        let stub = fs::read_to_string(destination.join("index/page_25")).unwrap();
        assert!(stub.contains("URL='../index.html#/Topic_1'"));

        let index = read_json(&destination.join("index.json"));
        assert_eq!(index["index/page_25"]["title"], "1: First topic");
        assert_eq!(index["index/page_25"]["index"]["content"], "Rocks and minerals");
        assert_eq!(index["index/page_25"]["is_front"], false);
        assert_eq!(index["index.html"]["is_front"], true);

        let metadata = read_json(&destination.join("metadata.json"));
        assert_eq!(metadata["Title"], "Geosciences");
        assert_eq!(metadata["Language"], "eng");
        assert_eq!(metadata["Tags"], serde_json::json!(["mindtouch", "geo"]));
    }

    #[test]
    fn stale_staging_directory_is_wiped() {
        let output = tempfile::tempdir().unwrap();
        let staging = output.path().join("geo.tmp");
        fs::create_dir_all(staging.join("content")).unwrap();
        fs::write(staging.join("content/leftover.json"), "{}").unwrap();

        let mut archive = DirectoryArchive::create(output.path(), "geo", "index.html").unwrap();
        archive.add_item(ArchiveItem::bytes("index.html", "x")).unwrap();
        let destination = archive.finish().unwrap();

        assert!(!destination.join("content/leftover.json").exists());
        assert!(!staging.exists());
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
    use mindtouch2zim::archive::{ArchiveError, ArchiveItem, ArchiveWriter, DirectoryArchive};

    #[test]
    fn unsealed_archive_leaves_no_output() {
        let output = tempfile::tempdir().unwrap();
        let mut archive = DirectoryArchive::create(output.path(), "geo", "index.html").unwrap();
        archive.add_item(ArchiveItem::bytes("content/shared.json", "{}")).unwrap();

        assert!(matches!(archive.finish(), Err(ArchiveError::MissingMainPage(path)) if path == "index.html"));
        assert!(!output.path().join("geo").exists());
    }

    #[test]
    fn same_path_twice() {
        let output = tempfile::tempdir().unwrap();
        let mut archive = DirectoryArchive::create(output.path(), "geo", "index.html").unwrap();
        archive.add_item(ArchiveItem::bytes("content/logo.png", vec![1])).unwrap();

        assert!(matches!(
            archive.add_item(ArchiveItem::bytes("content/logo.png", vec![2])),
            Err(ArchiveError::DuplicatePath(_))
        ));
    }
}
