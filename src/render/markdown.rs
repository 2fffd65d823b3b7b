use crate::base::schema::{IncidentField, IncidentReport};

/// A line of the report layout: either a bare heading, or a heading followed by a field's value.
enum Section {
    Heading(&'static str),
    Field(&'static str, IncidentField),
}

/// The fixed chapter layout of the report.
const LAYOUT: &[Section] = &[
    Section::Field("# 1. Description of deviation", IncidentField::BeschrijvingAfwijking),
    Section::Heading("# 2. Measures"),
    Section::Field("## 2.1 Measures to control and correct the deviation", IncidentField::MaatregelenBeheersenCorrigeren),
    Section::Field("## 2.2 Adjust consequences", IncidentField::AanpassenConsequenties),
    Section::Field(
        "## 2.3 Risk assessment If the deviation is of such a nature, a risk assessment must be made. Contact the holder of the risk inventory",
        IncidentField::Risicoafweging,
    ),
    Section::Heading("# 3. Analysis and removing causes"),
    Section::Field("## 3.1 Cause of the deviation", IncidentField::OorzaakOntstaan),
    Section::Field("## 3.2 Consequences of the deviation", IncidentField::Gevolgen),
    Section::Field("## 3.3 Remove cause", IncidentField::OorzaakWegnemen),
    Section::Field("## 3.4 Could the deviation have occurred elsewhere", IncidentField::EldersVoorgedaan),
    Section::Field("## 3.5 Actions on deviation that occurred elsewhere", IncidentField::ActiesElders),
    Section::Heading("# 4. Assessment of measures taken This chapter will be filled once the JIRA actions are completed."),
    Section::Field("## 4.1 Effectiveness of the measures taken", IncidentField::Doeltreffendheid),
    Section::Field("## 4.2 Update of risk inventory based on deviation (if applicable)", IncidentField::ActualisatieRisico),
    Section::Field("## 4.3 Adjustment to quality system (if applicable)", IncidentField::AanpassingKwaliteitssysteem),
    Section::Field("# 5. Lessons learned", IncidentField::Leerpunten),
    Section::Field("# 6. Relation to ISO 27001 Annex A controls", IncidentField::RelatieIso27001AnnexA),
];

/// Render the report as a numbered Markdown document.
///
/// Every heading is always present; unanswered fields leave an empty line.
pub fn render_markdown(report: &IncidentReport) -> String {
    let mut lines = Vec::new();

    for (i, section) in LAYOUT.iter().enumerate() {
        match section {
            Section::Heading(heading) => {
                lines.push(heading.to_string());
            }
            Section::Field(heading, field) => {
                lines.push(heading.to_string());
                lines.push(report.get(*field).to_string());
            }
        }

        // Blank separator between sections, but not after the last one.
        if i + 1 < LAYOUT.len() {
            lines.push(String::new());
        }
    }

    lines.join("\n")
}
