use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const SHADER_DIR: &str = "shaders";

struct Preprocessor {
    include: Regex,
    define: Regex,
}

impl Preprocessor {
    fn new() -> Self {
        Self {
            include: Regex::new(r#"^#include <([[:graph:]]*)>$"#).unwrap(),
            define: Regex::new(r#"^// define ([A-Z_][A-Z0-9_]*)$"#).unwrap(),
        }
    }

    /// Inlines includes recursively, inserting `__POS__` markers so that
    /// compile errors can be traced back to the original file and line.
    fn process(&self, path: &Path, defines: &mut Vec<String>, depth: usize) -> String {
        assert!(depth < 16, "include depth exceeded in {}", path.display());

        let file = path.file_name().unwrap().to_string_lossy().into_owned();
        let text = fs::read_to_string(path).unwrap();

        println!("cargo:rerun-if-changed={}", path.display());

        let mut source = format!("// __POS__ {}:1\n", file);

        for (index, line) in text.lines().enumerate() {
            if let Some(captures) = self.include.captures(line) {
                let header = Path::new(SHADER_DIR).join(&captures[1]);

                source += &self.process(&header, defines, depth + 1);
                source += &format!("// __POS__ {}:{}\n", file, index + 2);
                continue;
            }

            if let Some(captures) = self.define.captures(line) {
                defines.push(captures[1].to_owned());
            }

            source += line;
            source += "\n";
        }

        source
    }
}

fn generate_shader_module(out_dir: &Path) {
    let preprocessor = Preprocessor::new();

    let mut entries: Vec<PathBuf> = fs::read_dir(SHADER_DIR)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| match path.extension() {
            Some(ext) => ext == "vert" || ext == "frag",
            None => false,
        })
        .collect();

    entries.sort();

    let mut module = String::new();

    for path in entries {
        let stem = path.file_stem().unwrap().to_string_lossy().into_owned();

        let prefix = match path.extension() {
            Some(ext) if ext == "vert" => "VS",
            _ => "FS",
        };

        let mut defines = vec![];
        let code = preprocessor.process(&path, &mut defines, 0);

        defines.sort();
        defines.dedup();

        let defines: Vec<String> = defines.iter().map(|name| format!("{:?}", name)).collect();

        module += &format!(
            "pub static {}_{}: ShaderInfo = ShaderInfo {{ name: {:?}, code: {:?}, defines: &[{}] }};\n",
            prefix,
            stem.to_uppercase(),
            stem,
            code,
            defines.join(", ")
        );
    }

    fs::write(out_dir.join("glsl_shaders.rs"), module).unwrap();
}

fn main() {
    built::write_built_file().expect("failed to acquire build-time information");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    println!("cargo:rerun-if-changed={}", SHADER_DIR);

    generate_shader_module(&out_dir);
}
