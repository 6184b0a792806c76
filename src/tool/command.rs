//! The tool's complete interactive vocabulary.
//!
//! Every control on the page (dropdowns, checkboxes, sliders, buttons,
//! chart brushing) maps to one [`ToolCommand`]. Hosts build commands and
//! pass them to [`Tool::execute`]; the tool never cares how a command was
//! triggered.

use super::Tool;
use crate::error::DmsVizError;
use crate::options::{OptionKey, ProteinOptions, ToolOption};
use crate::views::ViewportLayout;

/// Control id of the experiment dropdown.
pub const EXPERIMENT_CONTROL: &str = "experiment";
/// Control id of the protein epitope dropdown.
pub const PROTEIN_EPITOPE_CONTROL: &str = "proteinEpitope";
/// Control id of the chart epitope multi-select.
pub const CHART_EPITOPES_CONTROL: &str = "chartEpitopes";

/// A discrete or parameterized operation the tool can perform.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCommand {
    // ── Dataset scope ───────────────────────────────────────────────
    /// Switch the active experiment.
    SelectExperiment {
        /// Experiment name.
        name: String,
    },

    /// Color the structure by another epitope.
    SetProteinEpitope {
        /// Epitope name.
        epitope: String,
    },

    /// Plot a different set of epitopes.
    SetChartEpitopes {
        /// Epitope names, possibly empty.
        epitopes: Vec<String>,
    },

    /// Move a filter slider.
    SetFilter {
        /// Filter column.
        column: String,
        /// Minimum value kept.
        threshold: f64,
    },

    // ── Options ─────────────────────────────────────────────────────
    /// Set one scalar option.
    SetOption(ToolOption),

    /// Replace every structure display option (a preset).
    ApplyPreset(ProteinOptions),

    // ── Selection ───────────────────────────────────────────────────
    /// Brush or click on the chart.
    SelectSites {
        /// Sequential site numbers.
        sites: Vec<i64>,
    },

    /// Select every plotted site.
    SelectAllSites,

    /// Clear the selection.
    DeselectSites,

    // ── Layout / export ─────────────────────────────────────────────
    /// The window was resized.
    Resize {
        /// New page geometry.
        layout: ViewportLayout,
        /// Chart width.
        chart_width: f64,
    },

    /// Download the structure image.
    ExportProteinImage,

    /// Download the chart image.
    ExportChartImage,
}

impl ToolCommand {
    /// Translate a form control change into a command.
    ///
    /// `id` is the control's id: an option name, one of the dataset
    /// scope controls, or otherwise a filter column.
    pub fn from_control(id: &str, value: &str) -> Result<Self, DmsVizError> {
        let command = match id {
            EXPERIMENT_CONTROL => Self::SelectExperiment {
                name: value.to_owned(),
            },
            PROTEIN_EPITOPE_CONTROL => Self::SetProteinEpitope {
                epitope: value.to_owned(),
            },
            CHART_EPITOPES_CONTROL => Self::SetChartEpitopes {
                epitopes: serde_json::from_str(value).map_err(|_| {
                    DmsVizError::InvalidOption {
                        key: id.to_owned(),
                        value: value.to_owned(),
                    }
                })?,
            },
            _ => match OptionKey::from_name(id) {
                Some(key) => Self::SetOption(key.parse(value)?),
                None => Self::SetFilter {
                    column: id.to_owned(),
                    threshold: value.trim().parse().map_err(|_| {
                        DmsVizError::InvalidOption {
                            key: id.to_owned(),
                            value: value.to_owned(),
                        }
                    })?,
                },
            },
        };
        Ok(command)
    }
}

impl Tool {
    /// Run one command. Failures are logged and alerted; the state is
    /// left as it was.
    pub fn execute(&mut self, command: ToolCommand) {
        log::debug!("execute {command:?}");
        let result = match command {
            ToolCommand::SelectExperiment { name } => self.select_experiment(&name),
            ToolCommand::SetProteinEpitope { epitope } => self.set_protein_epitope(&epitope),
            ToolCommand::SetChartEpitopes { epitopes } => self.set_chart_epitopes(epitopes),
            ToolCommand::SetFilter { column, threshold } => self.set_filter(&column, threshold),
            ToolCommand::SetOption(option) => {
                self.set_option(option);
                Ok(())
            }
            ToolCommand::ApplyPreset(options) => {
                self.apply_protein_options(options);
                Ok(())
            }
            ToolCommand::SelectSites { sites } => {
                self.select_sites(&sites);
                Ok(())
            }
            ToolCommand::SelectAllSites => {
                self.select_all_sites();
                Ok(())
            }
            ToolCommand::DeselectSites => {
                self.deselect_sites();
                Ok(())
            }
            ToolCommand::Resize {
                layout,
                chart_width,
            } => {
                self.resize(&layout, chart_width);
                Ok(())
            }
            ToolCommand::ExportProteinImage => {
                self.export_protein_image();
                Ok(())
            }
            ToolCommand::ExportChartImage => {
                self.export_chart_image();
                Ok(())
            }
        };
        if let Err(e) = result {
            self.report(&e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::remote_tool;
    use super::*;
    use crate::options::SummaryKind;

    #[test]
    fn controls_map_to_commands() {
        assert_eq!(
            ToolCommand::from_control("summary", "min").unwrap(),
            ToolCommand::SetOption(ToolOption::Summary(SummaryKind::Min))
        );
        assert_eq!(
            ToolCommand::from_control("experiment", "abc").unwrap(),
            ToolCommand::SelectExperiment {
                name: "abc".to_owned()
            }
        );
        assert_eq!(
            ToolCommand::from_control("chartEpitopes", r#"["a","b"]"#).unwrap(),
            ToolCommand::SetChartEpitopes {
                epitopes: vec!["a".to_owned(), "b".to_owned()]
            }
        );
        assert_eq!(
            ToolCommand::from_control("times_seen", " 3 ").unwrap(),
            ToolCommand::SetFilter {
                column: "times_seen".to_owned(),
                threshold: 3.0
            }
        );
        assert!(ToolCommand::from_control("proteinOpacity", "2").is_err());
        assert!(ToolCommand::from_control("chartEpitopes", "a,b").is_err());
        assert!(ToolCommand::from_control("times_seen", "many").is_err());
    }

    #[test]
    fn failed_commands_are_alerted_and_change_nothing() {
        let (mut tool, page, _) = remote_tool();
        let before = tool.config().clone();
        tool.execute(ToolCommand::SelectExperiment {
            name: "missing".to_owned(),
        });
        tool.execute(ToolCommand::SetFilter {
            column: "missing".to_owned(),
            threshold: 1.0,
        });
        assert_eq!(tool.config(), &before);
        assert_eq!(page.alerts().len(), 2);
    }

    #[test]
    fn commands_reach_handlers() {
        let (mut tool, _, shared) = remote_tool();
        tool.execute(ToolCommand::from_control("floor", "false").unwrap());
        assert!(!tool.config().floor);
        assert!(!tool.chart().config().floor);

        tool.execute(ToolCommand::SelectAllSites);
        assert!(!tool.chart().selected_sites().is_empty());
        tool.execute(ToolCommand::DeselectSites);
        assert!(tool.chart().selected_sites().is_empty());

        tool.execute(ToolCommand::Resize {
            layout: ViewportLayout {
                window_height: 1000.0,
                header_height: 100.0,
                chart_height: 300.0,
            },
            chart_width: 800.0,
        });
        let recording = shared.borrow();
        assert!(recording.calls.contains(&"chart.resize".to_owned()));
        assert!(recording.calls.contains(&"protein.resize".to_owned()));
    }
}
