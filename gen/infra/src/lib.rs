use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dyn_clone::DynClone;
use itertools::Itertools;
use refgen_core::internal::*;

pub mod boilerplate;
pub mod source;
pub mod template;
pub mod test_dir;

pub use boilerplate::{dont_modify_comment, license};
pub use source::SourceFile;
pub use template::{Template, Vars};
pub use test_dir::discover_test_dir;

pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("REFGEN_LOG").try_init();
}

/// One generated file.
pub trait Fixture: 'static + Send + Sync + DynClone {
    /// Path of the file, relative to the test directory.
    fn filename(&self) -> String;
    fn render(&self) -> RefResult<String>;
}

dyn_clone::clone_trait_object!(Fixture);

/// Fixtures keyed by file name.
#[derive(Clone, Default)]
pub struct FixtureSuite(pub HashMap<String, Box<dyn Fixture>>);

impl FixtureSuite {
    pub fn add(&mut self, fixture: impl Fixture) -> RefResult<()> {
        let filename = fixture.filename();
        ensure!(!self.0.contains_key(&filename), "Two fixtures would write {filename}");
        self.0.insert(filename, Box::new(fixture));
        Ok(())
    }

    pub fn merge(&mut self, other: FixtureSuite) -> RefResult<()> {
        for (filename, fixture) in other.0 {
            ensure!(!self.0.contains_key(&filename), "Two fixtures would write {filename}");
            self.0.insert(filename, fixture);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn filenames(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).sorted().collect()
    }

    fn sorted(&self) -> impl Iterator<Item = (&String, &Box<dyn Fixture>)> {
        self.0.iter().sorted_by_key(|(k, _)| k.to_owned())
    }

    /// Renders every fixture without writing anything.
    pub fn render_all(&self) -> RefResult<Vec<(String, String)>> {
        self.sorted()
            .map(|(filename, fixture)| -> RefResult<(String, String)> {
                debug!("Rendering {filename}");
                let content =
                    fixture.render().with_context(|| format!("Generating {filename}"))?;
                Ok((filename.clone(), content))
            })
            .collect()
    }

    /// Renders and writes every fixture under `dir`, in file name order.
    pub fn write_to(&self, dir: &Path) -> RefResult<Vec<PathBuf>> {
        let mut written = vec![];
        for (filename, fixture) in self.sorted() {
            let content = fixture.render().with_context(|| format!("Generating {filename}"))?;
            let path = dir.join(filename);
            if let Some(parent) = path.parent() {
                fs_err::create_dir_all(parent)?;
            }
            fs_err::write(&path, content)?;
            info!("Wrote {}", path.display());
            println!("File '{filename}' written");
            written.push(path);
        }
        Ok(written)
    }
}
