//! The incident report: its fields, their labels and questions, and the collected values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A field of the incident report, in questionnaire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentField {
    BeschrijvingAfwijking,
    MaatregelenBeheersenCorrigeren,
    AanpassenConsequenties,
    Risicoafweging,
    OorzaakOntstaan,
    Gevolgen,
    OorzaakWegnemen,
    EldersVoorgedaan,
    ActiesElders,
    Doeltreffendheid,
    ActualisatieRisico,
    AanpassingKwaliteitssysteem,
    Leerpunten,
    RelatieIso27001AnnexA,
}

impl IncidentField {
    /// All fields, in the order they are asked.
    pub const ALL: [IncidentField; 14] = [
        IncidentField::BeschrijvingAfwijking,
        IncidentField::MaatregelenBeheersenCorrigeren,
        IncidentField::AanpassenConsequenties,
        IncidentField::Risicoafweging,
        IncidentField::OorzaakOntstaan,
        IncidentField::Gevolgen,
        IncidentField::OorzaakWegnemen,
        IncidentField::EldersVoorgedaan,
        IncidentField::ActiesElders,
        IncidentField::Doeltreffendheid,
        IncidentField::ActualisatieRisico,
        IncidentField::AanpassingKwaliteitssysteem,
        IncidentField::Leerpunten,
        IncidentField::RelatieIso27001AnnexA,
    ];

    /// The stable key of the field, as accepted by `edit` and used in Jira field maps.
    pub fn key(&self) -> &'static str {
        match self {
            IncidentField::BeschrijvingAfwijking => "beschrijving_afwijking",
            IncidentField::MaatregelenBeheersenCorrigeren => "maatregelen_beheersen_corrigeren",
            IncidentField::AanpassenConsequenties => "aanpassen_consequenties",
            IncidentField::Risicoafweging => "risicoafweging",
            IncidentField::OorzaakOntstaan => "oorzaak_ontstaan",
            IncidentField::Gevolgen => "gevolgen",
            IncidentField::OorzaakWegnemen => "oorzaak_wegnemen",
            IncidentField::EldersVoorgedaan => "elders_voorgedaan",
            IncidentField::ActiesElders => "acties_elders",
            IncidentField::Doeltreffendheid => "doeltreffendheid",
            IncidentField::ActualisatieRisico => "actualisatie_risico",
            IncidentField::AanpassingKwaliteitssysteem => "aanpassing_kwaliteitssysteem",
            IncidentField::Leerpunten => "leerpunten",
            IncidentField::RelatieIso27001AnnexA => "relatie_iso27001_annex_a",
        }
    }

    /// The numbered, human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            IncidentField::BeschrijvingAfwijking => "1. Description of deviation",
            IncidentField::MaatregelenBeheersenCorrigeren => "2.1 Measures to control and correct the deviation",
            IncidentField::AanpassenConsequenties => "2.2 Adjust consequences",
            IncidentField::Risicoafweging => "2.3 Risk assessment",
            IncidentField::OorzaakOntstaan => "3.1 Cause of the deviation",
            IncidentField::Gevolgen => "3.2 Consequences of the deviation",
            IncidentField::OorzaakWegnemen => "3.3 Remove cause",
            IncidentField::EldersVoorgedaan => "3.4 Could the deviation have occurred elsewhere",
            IncidentField::ActiesElders => "3.5 Actions on deviation that occurred elsewhere",
            IncidentField::Doeltreffendheid => "4.1 Effectiveness of the measures taken",
            IncidentField::ActualisatieRisico => "4.2 Update of risk inventory based on deviation (if applicable)",
            IncidentField::AanpassingKwaliteitssysteem => "4.3 Adjustment to quality system (if applicable)",
            IncidentField::Leerpunten => "5. Lessons learned",
            IncidentField::RelatieIso27001AnnexA => "6. Relation to ISO 27001 Annex A controls",
        }
    }

    /// The section number of the label (e.g. `2.3`, or `1` for `1.`).
    pub fn number(&self) -> &'static str {
        let head = self.label().split(' ').next().unwrap_or_default();
        head.trim_end_matches('.')
    }

    /// The question posed to the reporter for this field.
    pub fn question(&self) -> &'static str {
        match self {
            IncidentField::BeschrijvingAfwijking => {
                "*Describe the deviation*.\n\
                 Please provide the following details:\n\
                 * _Deviation identified_: Describe the deviation in detail.\n\
                 * _Impact_: Indicate which processes, systems, or stakeholders are affected.\n\
                 * _Initial assessment_: The holder of the risk inventory performs a risk assessment based on the risk inventory framework.\n\
                 * _Cause_: Briefly explain why this deviation occurred."
            }
            IncidentField::MaatregelenBeheersenCorrigeren => {
                "*What measures were taken to control and correct the deviation?*\n\
                 Measures have the following requirements:\n\
                 * _Immediate correction_: The error is corrected immediately where possible.\n\
                 * _Communication_: All stakeholders are informed about the deviation and the measures taken.\n\
                 * _Temporary solutions_: If a structural solution takes time, temporary measures are taken.\n\
                 * _Monitoring and control_: The situation is monitored to assess whether further actions are needed.\n\
                 * _Documentation_: All steps are recorded for future reference."
            }
            IncidentField::AanpassenConsequenties => {
                "*Are there any consequential adjustments?*\n\
                 Consider for instance the following types of adjustments:\n\
                 * _Changes to work processes_: Procedures and work methods are adjusted.\n\
                 * _Review of responsibilities_: Tasks and roles may be redistributed.\n\
                 * _Additional training and awareness_: Staff receive instruction to prevent recurrence.\n\
                 * _Policy adjustment_: Policies may be revised if necessary."
            }
            IncidentField::Risicoafweging => {
                "*Should a risk assessment be made?*\n\
                 If the deviation is of such a nature, a risk assessment must be made. Contact the holder of the risk inventory.\n\n\
                 A risk assessment includes:\n\
                 * Risk type:\n\
                 \x20 - Operational\n\
                 \x20 - Technical\n\
                 \x20 - Financial\n\
                 \x20 - Reputational\n\
                 \x20 - Other\n\n\
                 * Risk score (High/Medium/Low):\n\
                 Provide a score based on impact and likelihood.\n\n\
                 * Action need:\n\
                 \x20 - Immediate action required (use the incidents flow in JIRA)\n\
                 \x20 - Include in audit discussion\n\n\
                 *Please answer yes/no whether a risk assessment should be made.*"
            }
            IncidentField::OorzaakOntstaan => {
                "*What is the cause of the deviation?*\n\
                 Make sure to include:\n\
                 * Analysis of the source of the deviation.\n\
                 * Investigation into process errors, human errors, or technical problems.\n\
                 * Assessment of whether insufficient control measures contributed to the deviation."
            }
            IncidentField::Gevolgen => {
                "*What are the consequences of the deviation?*\n\
                 Make sure to include:\n\
                 * The impact on the organization, customers, or processes.\n\
                 * Potential risks and additional issues resulting from the deviation.\n\
                 * Financial or operational consequences."
            }
            IncidentField::OorzaakWegnemen => {
                "*How will the cause be removed?*\n\
                 Consider the following:\n\
                 * Structural adjustments to processes or systems to prevent recurrence.\n\
                 * Implementation of additional controls or improved work instructions.\n\
                 * Adjustments to software, hardware, or infrastructure if needed."
            }
            IncidentField::EldersVoorgedaan => {
                "*Could the deviation have occurred elsewhere?*\n\
                 Make sure to:\n\
                 * Check whether the same deviation also occurs in other departments or systems.\n\
                 * Analyze similar processes and whether they face the same risk."
            }
            IncidentField::ActiesElders => {
                "*What actions are needed for deviations that occurred elsewhere?*\n\
                 Consider the following actions:\n\
                 * If the deviation also occurred elsewhere, take preventive measures.\n\
                 * Implement improvements at other locations or within other teams.\n\
                 * Raise awareness and provide training to prevent recurrence."
            }
            IncidentField::Doeltreffendheid => {
                "*What is the effectiveness of the measures taken?*\n\
                 Make sure to include:\n\
                 * An evaluation of whether the measures have effectively resolved the issue.\n\
                 * Verify that the deviation has not recurred.\n\
                 * Feedback from involved employees and teams about the implementation."
            }
            IncidentField::ActualisatieRisico => {
                "*Should the risk inventory be updated based on this deviation?* (if applicable)\n\
                 * Adjust the risk inventory and control measures where needed.\n\
                 * Document any new risks that have emerged."
            }
            IncidentField::AanpassingKwaliteitssysteem => {
                "*Should the quality system be adjusted?* (if applicable)\n\
                 Consider:\n\
                 * Assessment of whether processes, guidelines, or protocols need adjustment.\n\
                 * Updating documentation and work instructions.\n\
                 * Communication to relevant stakeholders about changes to the quality system."
            }
            IncidentField::Leerpunten => {
                "*Lessons learned (anchoring and dissemination)*\n\
                 Consider:\n\
                 * What the organization has learned from this deviation.\n\
                 * Which structural improvements can be implemented to prevent future deviations.\n\
                 * Whether training or awareness measures are needed for employees.\n\
                 * How the process around deviations and corrective actions can be further optimized."
            }
            IncidentField::RelatieIso27001AnnexA => {
                "*Relation to ISO 27001 Annex A controls*\n\
                 If relevant, specify whether this deviation relates to a control from ISO 27001 Annex A. This is always explicitly stated. Include:\n\
                 * The specific control (e.g., A.5.25 Incident management).\n\
                 * The control's role in the occurrence or containment/control of the deviation.\n\
                 * Any proposed adjustments or improvement actions.\n\n\
                 Coordination on this is carried out with the ISMS coordinator."
            }
        }
    }

    /// The question prefixed with its section number, as shown in the thread.
    pub fn question_display(&self) -> String {
        format!("{}: {}", self.number(), self.question())
    }

    /// Look up a field by its exact key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Resolve a user-typed reference to a field.
    ///
    /// Accepts, in order of preference: the exact key, the section number (`2.3`),
    /// a prefix or substring of the label, or a substring of the key.
    pub fn resolve(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();

        if token.is_empty() {
            return None;
        }

        if let Some(field) = Self::from_key(&token) {
            return Some(field);
        }

        let number = token.trim_end_matches('.');
        if let Some(field) = Self::ALL.into_iter().find(|f| f.number() == number) {
            return Some(field);
        }

        if let Some(field) = Self::ALL.into_iter().find(|f| {
            let label = f.label().to_lowercase();
            label.starts_with(&token) || label.contains(&token)
        }) {
            return Some(field);
        }

        Self::ALL.into_iter().find(|f| f.key().contains(&token))
    }
}

/// The values collected so far for one incident.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentReport {
    values: BTreeMap<IncidentField, String>,
}

impl IncidentReport {
    /// The trimmed value of a field; empty when unset.
    pub fn get(&self, field: IncidentField) -> &str {
        self.values.get(&field).map(|v| v.trim()).unwrap_or_default()
    }

    pub fn set(&mut self, field: IncidentField, value: impl Into<String>) {
        self.values.insert(field, value.into());
    }

    pub fn is_filled(&self, field: IncidentField) -> bool {
        !self.get(field).is_empty()
    }

    pub fn filled_count(&self) -> usize {
        IncidentField::ALL.iter().filter(|f| self.is_filled(**f)).count()
    }
}
