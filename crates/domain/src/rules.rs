//! Consolidated rule table.
//!
//! Every keyword/regex family the intake pipeline consults (policy
//! patterns, legal-matter taxonomy, trigger phrases, US state names,
//! contact-detail extractors) is declared once here and compiled once at
//! startup into a [`RuleTable`].  Middleware units receive the table by
//! `Arc` and never compile their own patterns.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};

use crate::case::Urgency;
use crate::config::RulesConfig;
use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Categories
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A named family of case-insensitive patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Jailbreak,
    NonLegalTechnical,
    NonLegalEntertainment,
    NonLegalGeneralKnowledge,
    NonLegalCreative,
    SelfHarm,
    Weapons,
    HateSpeech,
    Threats,
    CaseDraftRequest,
    PdfRequest,
    LawyerContact,
    IntakeSignal,
    GeneralInfo,
    UrgencyHigh,
    UrgencyLow,
    PreviousLawyer,
    NoPreviousLawyer,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 18] = [
        Self::Jailbreak,
        Self::NonLegalTechnical,
        Self::NonLegalEntertainment,
        Self::NonLegalGeneralKnowledge,
        Self::NonLegalCreative,
        Self::SelfHarm,
        Self::Weapons,
        Self::HateSpeech,
        Self::Threats,
        Self::CaseDraftRequest,
        Self::PdfRequest,
        Self::LawyerContact,
        Self::IntakeSignal,
        Self::GeneralInfo,
        Self::UrgencyHigh,
        Self::UrgencyLow,
        Self::PreviousLawyer,
        Self::NoPreviousLawyer,
    ];

    pub const NON_LEGAL: [RuleCategory; 4] = [
        Self::NonLegalTechnical,
        Self::NonLegalEntertainment,
        Self::NonLegalGeneralKnowledge,
        Self::NonLegalCreative,
    ];

    pub const ABUSIVE: [RuleCategory; 4] =
        [Self::SelfHarm, Self::Weapons, Self::HateSpeech, Self::Threats];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jailbreak => "jailbreak",
            Self::NonLegalTechnical => "non_legal_technical",
            Self::NonLegalEntertainment => "non_legal_entertainment",
            Self::NonLegalGeneralKnowledge => "non_legal_general_knowledge",
            Self::NonLegalCreative => "non_legal_creative",
            Self::SelfHarm => "self_harm",
            Self::Weapons => "weapons",
            Self::HateSpeech => "hate_speech",
            Self::Threats => "threats",
            Self::CaseDraftRequest => "case_draft_request",
            Self::PdfRequest => "pdf_request",
            Self::LawyerContact => "lawyer_contact",
            Self::IntakeSignal => "intake_signal",
            Self::GeneralInfo => "general_info",
            Self::UrgencyHigh => "urgency_high",
            Self::UrgencyLow => "urgency_low",
            Self::PreviousLawyer => "previous_lawyer",
            Self::NoPreviousLawyer => "no_previous_lawyer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    fn builtin_patterns(&self) -> &'static [&'static str] {
        match self {
            Self::Jailbreak => JAILBREAK,
            Self::NonLegalTechnical => NON_LEGAL_TECHNICAL,
            Self::NonLegalEntertainment => NON_LEGAL_ENTERTAINMENT,
            Self::NonLegalGeneralKnowledge => NON_LEGAL_GENERAL_KNOWLEDGE,
            Self::NonLegalCreative => NON_LEGAL_CREATIVE,
            Self::SelfHarm => SELF_HARM,
            Self::Weapons => WEAPONS,
            Self::HateSpeech => HATE_SPEECH,
            Self::Threats => THREATS,
            Self::CaseDraftRequest => CASE_DRAFT_REQUEST,
            Self::PdfRequest => PDF_REQUEST,
            Self::LawyerContact => LAWYER_CONTACT,
            Self::IntakeSignal => INTAKE_SIGNAL,
            Self::GeneralInfo => GENERAL_INFO,
            Self::UrgencyHigh => URGENCY_HIGH,
            Self::UrgencyLow => URGENCY_LOW,
            Self::PreviousLawyer => PREVIOUS_LAWYER,
            Self::NoPreviousLawyer => NO_PREVIOUS_LAWYER,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Built-in pattern tables
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const JAILBREAK: &[&str] = &[
    r"\bignore\s+(all\s+|any\s+|the\s+|your\s+)?(previous|prior|above|earlier)?\s*(instructions|prompts|rules)\b",
    r"\bdisregard\s+(all\s+|any\s+|the\s+|your\s+)?(previous|prior|above|earlier)\b",
    r"\bforget\s+(all\s+|your\s+|the\s+)?(previous\s+|prior\s+)?(instructions|rules|prompts)\b",
    r"\bsystem\s+prompt\b",
    r"\bact\s+as\b",
    r"\bpretend\s+(to\s+be|you\s+are|you're)\b",
    r"\byou\s+are\s+now\b",
    r"\bdeveloper\s+mode\b",
    r"\bjailbreak",
    r"\boverride\s+(your\s+|the\s+)?(rules|instructions|guidelines|programming)\b",
    r"\bno\s+longer\s+bound\s+by\b",
];

const NON_LEGAL_TECHNICAL: &[&str] = &[
    r"\b(write|debug|fix|review|optimi[sz]e)\s+(some\s+|a\s+|the\s+|my\s+|this\s+)?(code|program|script|function|app|website|sql\s+query)\b",
    r"\b(python|javascript|typescript|java|c\+\+|golang|html|css|react)\s+(code|program|script|function|tutorial|question)\b",
    r"\bprogramming\b",
    r"\bcoding\b",
    r"\bcompil(e|er)\s+error\b",
];

const NON_LEGAL_ENTERTAINMENT: &[&str] = &[
    r"\btell\s+me\s+a\s+(joke|riddle|story)\b",
    r"\brole\s*-?\s*play\b",
    r"\bplay\s+a\s+game\b",
    r"\b(recommend|suggest)\s+(a\s+|some\s+)?(movie|movies|tv\s+show|song|songs|book|books|video\s+game|video\s+games)\b",
    r"\b(favorite|favourite)\s+(movie|song|band|celebrity)\b",
];

const NON_LEGAL_GENERAL_KNOWLEDGE: &[&str] = &[
    r"\bwhat\s+is\s+the\s+capital\s+of\b",
    r"\b(weather|forecast)\s+(today|tomorrow|this\s+week)\b",
    r"\bwho\s+won\s+the\b",
    r"\b(solve|calculate)\s+(this\s+)?(equation|math\s+problem)\b",
    r"\b(help\s+(me\s+)?with|do)\s+my\s+homework\b",
    r"\bresearch\s+(paper|essay|report)\s+(on|about)\b",
    r"\brecipe\s+for\b",
];

const NON_LEGAL_CREATIVE: &[&str] = &[
    r"\bwrite\s+(me\s+)?(a|an)\s+(poem|song|story|novel|haiku|limerick|essay|screenplay|short\s+story)\b",
    r"\bcreative\s+writing\b",
    r"\bsong\s+lyrics\b",
];

const SELF_HARM: &[&str] = &[
    r"\b(kill|hurt|harm)\s+myself\b",
    r"\bsuicid(e|al)\b",
    r"\bend\s+my\s+life\b",
    r"\bself[\s-]?harm\b",
];

const WEAPONS: &[&str] = &[
    r"\b(build|make|assemble)\s+(a\s+|an\s+)?(bomb|explosive|pipe\s+bomb|ghost\s+gun|untraceable\s+gun)\b",
    r"\bhow\s+to\s+(make|build)\s+(a\s+)?(weapon|bomb|explosive)s?\b",
];

const HATE_SPEECH: &[&str] = &[
    r"\b(all|those)\s+\w+\s+(should|must|deserve\s+to)\s+(die|be\s+killed|be\s+exterminated)\b",
    r"\bexterminate\s+(all|the)\b",
    r"\bethnic\s+cleansing\b",
    r"\b(inferior|subhuman)\s+(race|people)\b",
];

const THREATS: &[&str] = &[
    r"\bi\s*('ll|\s+will|\s+am\s+going\s+to|'m\s+going\s+to|\s+want\s+to)\s+(kill|hurt|shoot|stab|attack|beat\s+up)\s+(you|him|her|them|my)\b",
    r"\byou('ll|\s+will)\s+(regret|pay\s+for)\s+this\b",
    r"\bi\s+know\s+where\s+you\s+live\b",
];

const CASE_DRAFT_REQUEST: &[&str] = &[
    r"\b(build|create|start|make|prepare|draft|put\s+together)\s+(a\s+|my\s+|the\s+)?case\s+(draft|summary|file)\b",
    r"\bcase\s+draft\b",
    r"\borgani[sz]e\s+my\s+case\b",
    r"\bbuild\s+my\s+case\b",
    r"\bsummari[sz]e\s+my\s+case\b",
];

const PDF_REQUEST: &[&str] = &[
    r"\b(generate|create|download|export|make|send|save|get|print|produce)\b.{0,40}\bpdf\b",
    r"\bpdf\s+(version|copy|export|download|of)\b",
    r"\bas\s+a\s+pdf\b",
];

const LAWYER_CONTACT: &[&str] = &[
    r"\b(speak|talk|connect|meet)\s+(to|with)\s+(a|an|the|your)?\s*(lawyer|attorney|counsel)\b",
    r"\b(hire|retain)\s+(a|an)\s+(lawyer|attorney)\b",
    r"\bschedule\s+(a\s+)?(consultation|call|appointment)\b",
    r"\bcontact\s+(a|the)\s+(lawyer|attorney)\b",
];

const INTAKE_SIGNAL: &[&str] = &[
    r"\bi\s+(was|got|am\s+being|have\s+been)\s+(fired|sued|arrested|evicted|injured|hurt|charged|harassed|terminated|laid\s+off)\b",
    r"\bneed\s+(legal\s+)?help\b",
    r"\bmy\s+(landlord|employer|boss|spouse|husband|wife|ex|tenant|business\s+partner)\b",
    r"\blegal\s+(issue|problem|matter)\b",
];

const GENERAL_INFO: &[&str] = &[
    r"^\s*(what|how|why|when|can|is|are|do|does|should)\b",
    r"\?\s*$",
];

const URGENCY_HIGH: &[&str] = &[
    r"\burgent(ly)?\b",
    r"\bemergency\b",
    r"\basap\b",
    r"\bimmediately\b",
    r"\bcourt\s+date\s+(is\s+)?(tomorrow|this\s+week|next\s+week)\b",
];

const URGENCY_LOW: &[&str] = &[
    r"\bnot\s+(urgent|an\s+emergency|in\s+a\s+hurry)\b",
    r"\broutine\b",
    r"\bno\s+rush\b",
];

const PREVIOUS_LAWYER: &[&str] = &[
    r"\bi\s+(already\s+)?(have|had|hired|retained)\s+(a|an)\s+(lawyer|attorney)\b",
    r"\bmy\s+(current\s+|previous\s+|former\s+|old\s+)?(lawyer|attorney)\b",
];

const NO_PREVIOUS_LAWYER: &[&str] = &[
    r"\b(don't|do\s+not|never)\s+(have|had|hired)\s+(a|an)\s+(lawyer|attorney)\b",
    r"\bno\s+(lawyer|attorney)\b",
];

/// Legal-matter taxonomy, in detection priority order.
const LEGAL_MATTERS: &[(&str, &[&str])] = &[
    (
        "Family Law",
        &[
            r"\bdivorc", r"\bcustody\b", r"\bchild\s+support\b", r"\balimony\b",
            r"\bseparation\b", r"\badoption\b", r"\bvisitation\b", r"\bprenup",
        ],
    ),
    (
        "Employment Law",
        &[
            r"\bfired\b", r"\bterminat(ed|ion)\b", r"\blaid\s+off\b", r"\bharass",
            r"\bdiscriminat", r"\bovertime\b", r"\bunpaid\s+wages?\b", r"\bwrongful\s+termination\b",
            r"\bworkplace\b", r"\bretaliat", r"\bmy\s+(employer|boss)\b", r"\bunsafe\s+work",
        ],
    ),
    (
        "Landlord/Tenant",
        &[
            r"\blandlord\b", r"\btenant\b", r"\bevict", r"\blease\b", r"\bsecurity\s+deposit\b",
            r"\bback\s+rent\b",
        ],
    ),
    (
        "Personal Injury",
        &[
            r"\binjur", r"\baccident\b", r"\bslip\s+and\s+fall\b", r"\bmedical\s+malpractice\b",
            r"\bcar\s+crash\b", r"\bdog\s+bite\b",
        ],
    ),
    (
        "Criminal Law",
        &[
            r"\barrest", r"\bcharged\s+with\b", r"\bcriminal\b", r"\bdui\b", r"\bdwi\b",
            r"\bfelony\b", r"\bmisdemeanor\b", r"\bprobation\b",
        ],
    ),
    (
        "Contract Review",
        &[r"\bcontracts?\b", r"\bagreement\b", r"\bbreach\s+of\s+contract\b"],
    ),
    (
        "Business Law",
        &[
            r"\bmy\s+business\b", r"\bllc\b", r"\bcorporation\b", r"\bpartnership\b",
            r"\bstartup\b", r"\bincorporat",
        ],
    ),
    (
        "Estate Planning",
        &[
            r"\blast\s+will\b", r"\bmy\s+will\b", r"\bliving\s+trust\b", r"\bestate\s+plan",
            r"\binheritance\b", r"\bprobate\b", r"\bpower\s+of\s+attorney\b",
        ],
    ),
    (
        "Immigration",
        &[
            r"\bvisa\b", r"\bgreen\s+card\b", r"\bimmigra", r"\bdeport",
            r"\bcitizenship\b", r"\basylum\b",
        ],
    ),
    (
        "Intellectual Property",
        &[r"\bpatent", r"\btrademark", r"\bcopyright", r"\bintellectual\s+property\b"],
    ),
    (
        "Bankruptcy",
        &[
            r"\bbankrupt", r"\bdebt\s+collect", r"\bforeclos", r"\bchapter\s+(7|11|13)\b",
        ],
    ),
    (
        "Consumer Protection",
        &[r"\bscam", r"\bdefective\s+product\b", r"\bwarranty\b", r"\bconsumer\s+fraud\b"],
    ),
];

/// US states plus DC: (full name, postal abbreviation).
pub const US_STATES: &[(&str, &str)] = &[
    ("Alabama", "AL"), ("Alaska", "AK"), ("Arizona", "AZ"), ("Arkansas", "AR"),
    ("California", "CA"), ("Colorado", "CO"), ("Connecticut", "CT"), ("Delaware", "DE"),
    ("District of Columbia", "DC"), ("Florida", "FL"), ("Georgia", "GA"), ("Hawaii", "HI"),
    ("Idaho", "ID"), ("Illinois", "IL"), ("Indiana", "IN"), ("Iowa", "IA"),
    ("Kansas", "KS"), ("Kentucky", "KY"), ("Louisiana", "LA"), ("Maine", "ME"),
    ("Maryland", "MD"), ("Massachusetts", "MA"), ("Michigan", "MI"), ("Minnesota", "MN"),
    ("Mississippi", "MS"), ("Missouri", "MO"), ("Montana", "MT"), ("Nebraska", "NE"),
    ("Nevada", "NV"), ("New Hampshire", "NH"), ("New Jersey", "NJ"), ("New Mexico", "NM"),
    ("New York", "NY"), ("North Carolina", "NC"), ("North Dakota", "ND"), ("Ohio", "OH"),
    ("Oklahoma", "OK"), ("Oregon", "OR"), ("Pennsylvania", "PA"), ("Rhode Island", "RI"),
    ("South Carolina", "SC"), ("South Dakota", "SD"), ("Tennessee", "TN"), ("Texas", "TX"),
    ("Utah", "UT"), ("Vermont", "VT"), ("Virginia", "VA"), ("Washington", "WA"),
    ("West Virginia", "WV"), ("Wisconsin", "WI"), ("Wyoming", "WY"),
];

const TIMELINE: &str = r"(?i)\b((?:\d+|a|an|one|two|three|four|five|six|seven|eight|nine|ten|a\s+few|several|a\s+couple\s+of)\s+(?:day|week|month|year)s?\s+ago|yesterday|last\s+(?:week|month|year|night)|earlier\s+this\s+(?:week|month|year)|since\s+(?:january|february|march|april|may|june|july|august|september|october|november|december|\d{4}))\b";

const CONTACT_NAME: &str =
    r"(?i:\bmy\s+name\s+is|\bname:|\bi\s+am|\bi'm)\s+([A-Z][A-Za-z'\-]+(?:\s+[A-Z][A-Za-z'\-]+){0,3})";
const CONTACT_EMAIL: &str = r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}";
const CONTACT_PHONE: &str =
    r"(?:\+?\d{1,2}[\s.\-]?)?(?:\(?\d{3}\)?[\s.\-]?)?\d{3}[\s.\-]\d{4}\b|\b\d{10}\b";
const CONTACT_LOCATION: &str = r"(?i:\bi\s+live\s+in|\bi'm\s+located\s+in|\bi\s+am\s+located\s+in|\blocated\s+in|\bbased\s+in|\bi\s+reside\s+in|\bmy\s+location\s+is|\blocation:)\s+([^.!?;\n]{2,80})";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Compiled table
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct MatterRule {
    label: String,
    pattern: Regex,
}

/// Contact details pulled out of free text. Unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
}

impl ExtractedContact {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.phone.is_none() && self.location.is_none()
    }
}

/// All pipeline rules, compiled once.
pub struct RuleTable {
    sets: HashMap<RuleCategory, RegexSet>,
    matters: Vec<MatterRule>,
    state_names: Regex,
    state_abbreviations: Regex,
    timeline: Regex,
    contact_name: Regex,
    contact_email: Regex,
    contact_phone: Regex,
    contact_location: Regex,
}

impl std::fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleTable")
            .field("categories", &self.sets.len())
            .field("matters", &self.matters.len())
            .finish()
    }
}

impl RuleTable {
    /// Compile the built-in rules with no configured extras.
    pub fn builtin() -> Result<Self> {
        Self::compile(&RulesConfig::default())
    }

    /// Compile the built-in rules plus the extras from `[rules]`.
    pub fn compile(cfg: &RulesConfig) -> Result<Self> {
        for name in cfg.extra_patterns.keys() {
            if RuleCategory::from_name(name).is_none() {
                return Err(Error::Config(format!("rules.extra_patterns: unknown category '{name}'")));
            }
        }

        let mut sets = HashMap::new();
        for category in RuleCategory::ALL {
            let mut patterns: Vec<String> =
                category.builtin_patterns().iter().map(|p| (*p).to_owned()).collect();
            if let Some(extra) = cfg.extra_patterns.get(category.as_str()) {
                patterns.extend(extra.iter().cloned());
            }
            let set = RegexSetBuilder::new(&patterns)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::Config(format!("rules.{}: {e}", category.as_str())))?;
            sets.insert(category, set);
        }

        let mut matter_patterns: Vec<(String, Vec<String>)> = LEGAL_MATTERS
            .iter()
            .map(|(label, pats)| {
                ((*label).to_owned(), pats.iter().map(|p| (*p).to_owned()).collect())
            })
            .collect();
        for (label, extra) in &cfg.extra_matters {
            match matter_patterns.iter_mut().find(|(l, _)| l == label) {
                Some((_, pats)) => pats.extend(extra.iter().cloned()),
                None => matter_patterns.push((label.clone(), extra.clone())),
            }
        }
        let matters = matter_patterns
            .into_iter()
            .map(|(label, pats)| {
                let joined = pats
                    .iter()
                    .map(|p| format!("(?:{p})"))
                    .collect::<Vec<_>>()
                    .join("|");
                RegexBuilder::new(&joined)
                    .case_insensitive(true)
                    .build()
                    .map(|pattern| MatterRule { label: label.clone(), pattern })
                    .map_err(|e| Error::Config(format!("rules.extra_matters.{label}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        // Longest names first so "West Virginia" wins over "Virginia".
        let mut names: Vec<&str> = US_STATES.iter().map(|(name, _)| *name).collect();
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        let state_names = compile_static(&format!(
            r"(?i)\b({})\b",
            names.iter().map(|n| n.replace(' ', r"\s+")).collect::<Vec<_>>().join("|")
        ))?;
        let abbreviations = US_STATES.iter().map(|(_, a)| *a).collect::<Vec<_>>().join("|");
        let state_abbreviations =
            compile_static(&format!(r"(?:,\s*|\b[Ii]n\s+)({abbreviations})\b"))?;

        Ok(Self {
            sets,
            matters,
            state_names,
            state_abbreviations,
            timeline: compile_static(TIMELINE)?,
            contact_name: compile_static(CONTACT_NAME)?,
            contact_email: compile_static(CONTACT_EMAIL)?,
            contact_phone: compile_static(CONTACT_PHONE)?,
            contact_location: compile_static(CONTACT_LOCATION)?,
        })
    }

    /// Whether `text` matches any pattern in `category`.
    pub fn matches(&self, category: RuleCategory, text: &str) -> bool {
        self.sets
            .get(&category)
            .map(|set| set.is_match(text))
            .unwrap_or(false)
    }

    /// First category of `categories` that `text` matches, in the given order.
    pub fn first_match(&self, categories: &[RuleCategory], text: &str) -> Option<RuleCategory> {
        categories.iter().copied().find(|c| self.matches(*c, text))
    }

    /// Legal-matter labels mentioned in `text`, in taxonomy order.
    pub fn detect_matters(&self, text: &str) -> Vec<&str> {
        self.matters
            .iter()
            .filter(|m| m.pattern.is_match(text))
            .map(|m| m.label.as_str())
            .collect()
    }

    /// First US state mentioned by full name, or by postal code after a
    /// comma / "in" (e.g. "Charlotte, NC").  Returns the full name.
    pub fn detect_us_state(&self, text: &str) -> Option<&'static str> {
        if let Some(caps) = self.state_names.captures(text) {
            return normalize_state(&caps[1]);
        }
        self.state_abbreviations
            .captures(text)
            .and_then(|caps| normalize_state(&caps[1]))
    }

    pub fn detect_urgency(&self, text: &str) -> Option<Urgency> {
        if self.matches(RuleCategory::UrgencyLow, text) {
            Some(Urgency::Low)
        } else if self.matches(RuleCategory::UrgencyHigh, text) {
            Some(Urgency::High)
        } else {
            None
        }
    }

    pub fn detect_timeline(&self, text: &str) -> Option<String> {
        self.timeline.captures(text).map(|caps| caps[1].to_owned())
    }

    /// `Some(true)` / `Some(false)` when the text says whether the client
    /// already has a lawyer.
    pub fn detect_previous_lawyer(&self, text: &str) -> Option<bool> {
        if self.matches(RuleCategory::NoPreviousLawyer, text) {
            Some(false)
        } else if self.matches(RuleCategory::PreviousLawyer, text) {
            Some(true)
        } else {
            None
        }
    }

    pub fn extract_contact(&self, text: &str) -> ExtractedContact {
        let capture = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().trim_end_matches(',').trim().to_owned())
                .filter(|s| !s.is_empty())
        };
        ExtractedContact {
            name: capture(&self.contact_name),
            email: self.contact_email.find(text).map(|m| m.as_str().to_owned()),
            phone: self.contact_phone.find(text).map(|m| m.as_str().trim().to_owned()),
            location: capture(&self.contact_location).map(|l| trim_location(&l)).filter(|l| !l.is_empty()),
        }
    }
}

/// Cut a captured location at the first trailing clause ("Austin, TX and
/// I was fired" → "Austin, TX") and cap its length.
fn trim_location(raw: &str) -> String {
    const CLAUSE_BREAKS: &[&str] = &[" and ", " but ", " where ", " because ", " so ", " since ", ", and "];
    let lower = raw.to_lowercase();
    let cut = CLAUSE_BREAKS
        .iter()
        .filter_map(|b| lower.find(b))
        .min()
        .unwrap_or(raw.len());
    let cut = if raw.is_char_boundary(cut) { cut } else { raw.len() };
    raw[..cut]
        .chars()
        .take(60)
        .collect::<String>()
        .trim()
        .trim_end_matches(',')
        .to_owned()
}

fn compile_static(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config(format!("built-in rule failed to compile: {e}")))
}

/// Map a state name or postal code (any case) to its full name.
pub fn normalize_state(raw: &str) -> Option<&'static str> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.len() == 2 {
        return US_STATES
            .iter()
            .find(|(_, abbr)| abbr.eq_ignore_ascii_case(&collapsed))
            .map(|(name, _)| *name);
    }
    US_STATES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(&collapsed))
        .map(|(name, _)| *name)
}

/// Resolve a free-form location ("Charlotte, NC", "west virginia",
/// "Austin Texas") to a US state's full name.
pub fn resolve_state(location: &str) -> Option<&'static str> {
    if let Some(state) = normalize_state(location) {
        return Some(state);
    }
    if let Some(state) = location.rsplit(',').find_map(|part| normalize_state(part.trim())) {
        return Some(state);
    }
    let lower = location.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let mut names: Vec<&'static str> = US_STATES.iter().map(|(name, _)| *name).collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names.into_iter().find(|name| {
        let name = name.to_lowercase();
        lower
            .match_indices(&name)
            .any(|(i, _)| is_word_boundary(&lower, i, i + name.len()))
    })
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
