/// Reduces a Go source file to the MiniGo subset: `package` and `import`
/// declarations are blanked and `fmt.Print`/`fmt.Println` become the
/// builtins. Lines are blanked rather than removed so positions reported
/// later still match the file.
pub fn preprocess(source: &str) -> String {
    let mut out = Vec::new();
    let mut in_import_group = false;
    for line in source.lines() {
        let trimmed = line.trim();
        if in_import_group {
            in_import_group = !trimmed.starts_with(')');
            out.push(String::new());
            continue;
        }
        if trimmed.starts_with("package ") {
            out.push(String::new());
            continue;
        }
        if trimmed.starts_with("import ") || trimmed.starts_with("import(") {
            in_import_group = trimmed.contains('(') && !trimmed.contains(')');
            out.push(String::new());
            continue;
        }
        out.push(line.replace("fmt.Println", "println").replace("fmt.Print", "print"));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::preprocess;

    #[test]
    fn drops_package_and_imports_keeping_lines() {
        let src = "package main\n\nimport \"fmt\"\n\nfunc main() {\n\tfmt.Println(1)\n}";
        let out = preprocess(src);
        assert_eq!(out, "\n\n\n\nfunc main() {\n\tprintln(1)\n}");
        assert_eq!(out.lines().count(), src.lines().count());
    }

    #[test]
    fn drops_grouped_imports() {
        let src = "package main\nimport (\n\t\"fmt\"\n\t\"os\"\n)\nfunc main() { }";
        assert_eq!(preprocess(src).trim(), "func main() { }");
        assert_eq!(preprocess("import (\"fmt\")\nfunc main() { }").trim(), "func main() { }");
    }

    #[test]
    fn rewrites_both_print_functions() {
        assert_eq!(preprocess("fmt.Print(1); fmt.Println(2)"), "print(1); println(2)");
    }

    #[test]
    fn leaves_other_lines_alone() {
        let src = "func main() {\n\tvar packages int = 1\n}";
        assert_eq!(preprocess(src), src);
    }

    #[test]
    fn repository_testcases_compile() {
        // crates/minigoc -> repo root -> testcase/
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testcase");
        let mut seen = 0;
        for entry in fs::read_dir(&dir).expect("failed to read testcase/") {
            let path = entry.expect("dir entry").path();
            if path.extension().and_then(|e| e.to_str()) != Some("go") { continue; }
            let src = fs::read_to_string(&path).expect("failed to read testcase");
            if let Err(e) = minigo_compiler::compile(&preprocess(&src)) {
                panic!("{}: {e}", path.display());
            }
            seen += 1;
        }
        assert!(seen > 0, "no .go files in {}", dir.display());
    }
}
