use vfs_tree::{FileAttributes, FileManager, TreeFS};

fn main() {
    // builds `/docs` and `/bin/hello.sh` from a literal;
    // the current directory starts at `/`
    let mut fs = TreeFS::from_json_str(r#"{"docs": {}, "bin": {"hello.sh": "echo hello"}}"#)
        .unwrap();

    // change current directory to `/docs`
    fs.cd("docs").unwrap();

    // `first.txt` is created in `/docs` because the parent path is relative;
    // a destination needs a parent segment and a name
    assert!(fs.create_file("./first.txt", Some(b"Hello"), &FileAttributes::new()));
    assert!(fs.file_exists("first.txt"));

    // `/tmp/out` and its missing parents are created at once
    fs.create_directory("/tmp/out", true, &FileAttributes::new())
        .unwrap();

    // copies never share data with their source
    fs.copy_item("/docs/first.txt", "/tmp/out/second.txt").unwrap();
    fs.write("/tmp/out/second.txt", b"World").unwrap();

    fs.cd("..").unwrap();
    let first = fs.contents("/docs/first.txt").unwrap();
    let second = fs.contents("tmp/out/second.txt").unwrap();

    println!(
        "{}, {}!",
        String::from_utf8(first).unwrap(),
        String::from_utf8(second).unwrap()
    );

    // moves are copy + remove
    fs.move_item("/bin/hello.sh", "/tmp/hello.sh").unwrap();
    assert!(!fs.file_exists("/bin/hello.sh"));

    for path in fs.tree("/").unwrap() {
        println!("{path}");
    }
}
