mod page_to_archive;
