use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    delivery::DirectoryDelivery, error::ContextError, generator::GeneratorOptions,
    sections::Branding, typography::FontData,
};

/// How reports are generated and where they are saved, as read from a JSON file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfiguration {
    pub font_files: FontFiles,
    pub brand_title: String,
    pub footer_caption: String,
    pub output_directory: PathBuf,
}

/// TrueType files for the faces of the report font. Relative paths are resolved against the
/// directory of the configuration file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FontFiles {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
    pub italic: Option<PathBuf>,
    pub bold_italic: Option<PathBuf>,
}

impl Default for ReportConfiguration {
    fn default() -> Self {
        let branding = Branding::default();
        ReportConfiguration {
            font_files: FontFiles::default(),
            brand_title: branding.brand_title,
            footer_caption: branding.footer_caption,
            output_directory: PathBuf::from("."),
        }
    }
}

impl ReportConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ContextError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to read the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;
        let mut configuration: ReportConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ContextError::with_error(
                    format!(
                        "Failed to parse the configuration file {:?}",
                        configuration_file_path
                    ),
                    &error,
                )
            })?;

        if let Some(base_directory) = configuration_file_path.parent() {
            configuration.resolve_paths(base_directory);
        }

        Ok(configuration)
    }

    fn resolve_paths(&mut self, base_directory: &Path) {
        let resolve = |path: &mut Option<PathBuf>| {
            if let Some(path) = path.as_mut().filter(|path| path.is_relative()) {
                *path = base_directory.join(&*path);
            }
        };
        resolve(&mut self.font_files.regular);
        resolve(&mut self.font_files.bold);
        resolve(&mut self.font_files.italic);
        resolve(&mut self.font_files.bold_italic);
        if self.output_directory.is_relative() {
            self.output_directory = base_directory.join(&self.output_directory);
        }
    }

    /// Reads the configured font files. A file that cannot be read is logged and left out, so
    /// its face falls back to the built-in font like any other missing face.
    pub fn to_generator_options(&self) -> GeneratorOptions {
        let font_data = FontData {
            regular: read_font_file(self.font_files.regular.as_deref()),
            bold: read_font_file(self.font_files.bold.as_deref()),
            italic: read_font_file(self.font_files.italic.as_deref()),
            bold_italic: read_font_file(self.font_files.bold_italic.as_deref()),
        };

        GeneratorOptions {
            fonts: font_data.regular.is_some().then_some(font_data),
            branding: Branding {
                brand_title: self.brand_title.clone(),
                footer_caption: self.footer_caption.clone(),
            },
            creation_date: None,
        }
    }

    pub fn delivery(&self) -> DirectoryDelivery {
        DirectoryDelivery::new(&self.output_directory)
    }
}

fn read_font_file(font_path: Option<&Path>) -> Option<Vec<u8>> {
    let font_path = font_path?;
    std::fs::read(font_path)
        .map_err(|error| {
            log::warn!("Failed to read the font file {:?}: {}", font_path, error);
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_the_defaults() {
        let configuration: ReportConfiguration =
            serde_json::from_str(r#"{ "brandTitle": "Tutorly" }"#).unwrap();

        assert_eq!(configuration.brand_title, "Tutorly");
        assert_eq!(
            configuration.footer_caption,
            "Generated by Epistemy AI Platform"
        );
        assert_eq!(configuration.output_directory, PathBuf::from("."));
        assert_eq!(configuration.font_files, FontFiles::default());
    }

    #[test]
    fn relative_paths_follow_the_configuration_file() {
        let mut configuration: ReportConfiguration = serde_json::from_str(
            r#"{
                "fontFiles": { "regular": "fonts/Sans.ttf", "boldItalic": "/usr/share/Sans-BI.ttf" },
                "outputDirectory": "reports"
            }"#,
        )
        .unwrap();
        configuration.resolve_paths(Path::new("/srv/epistemy"));

        assert_eq!(
            configuration.font_files.regular,
            Some(PathBuf::from("/srv/epistemy/fonts/Sans.ttf"))
        );
        assert_eq!(
            configuration.font_files.bold_italic,
            Some(PathBuf::from("/usr/share/Sans-BI.ttf"))
        );
        assert_eq!(
            configuration.output_directory,
            PathBuf::from("/srv/epistemy/reports")
        );
    }

    #[test]
    fn unreadable_font_files_are_left_out() {
        let configuration = ReportConfiguration {
            font_files: FontFiles {
                regular: Some(PathBuf::from("/nonexistent/Regular.ttf")),
                ..FontFiles::default()
            },
            ..ReportConfiguration::default()
        };
        let options = configuration.to_generator_options();

        assert!(options.fonts.is_none());
        assert_eq!(options.branding, Branding::default());
    }
}
