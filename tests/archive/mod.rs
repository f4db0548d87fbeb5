mod directory_archive;
