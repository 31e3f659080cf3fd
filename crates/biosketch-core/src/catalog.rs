//! Static lookup tables: keyword → drawing, symptom → canned explanation and drawing sequence.
//!
//! The built-in tables can be replaced by a JSON file with the same shape as [`Catalog`].
//! Any load or parse failure falls back to the built-ins.

use crate::error::{SketchError, SketchResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Category used when no symptom matches.
pub const GENERAL_CATEGORY: &str = "general";

/// Drawing shown when a reply carries no usable drawing instructions.
pub const DEFAULT_DRAWING: &str = "probiotico";

/// Every drawing key the illustration player knows, with a short description for prompts.
pub const DRAWINGS: &[(&str, &str)] = &[
    ("probiotico", "Cápsula del probiótico"),
    ("intestino", "Intestino sano"),
    ("intestino_inflamado", "Intestino con inflamación"),
    ("intestino_lento", "Intestino con tránsito lento"),
    ("bacterias", "Colonia de bacterias"),
    ("bacterias_buenas", "Bacterias beneficiosas verdes"),
    ("bacterias_malas", "Bacterias dañinas rojas"),
    ("batalla", "Batalla entre bacterias"),
    ("equilibrio", "Balanza equilibrada"),
    ("digestion", "Proceso digestivo"),
    ("estomago", "Estómago"),
    ("gases", "Burbujas de gas"),
    ("alivio", "Sensación de alivio"),
    ("defensas", "Sistema inmune"),
    ("nutrientes", "Absorción de nutrientes"),
    ("reloj", "Tiempo/regularidad"),
    ("escudo", "Protección"),
    ("lactobacilo", "Lactobacilo"),
    ("bifidobacteria", "Bifidobacteria"),
    ("fermentacion", "Fermentación de la lactosa"),
    ("beneficios", "Beneficios para la salud"),
    ("microbiota", "Microbiota intestinal"),
    ("probioticos", "Beneficios de los probióticos"),
];

/// True when `key` names a known drawing.
pub fn is_known_drawing(key: &str) -> bool {
    DRAWINGS.iter().any(|(k, _)| *k == key)
}

/// A keyword whose presence in the transcript fires one drawing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    /// Lowercase substring searched in the transcript.
    pub keyword: String,
    /// Drawing key fired on match.
    pub category: String,
}

/// A symptom category with its canned explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub category: String,
    /// Lowercase substrings; any one of them selects this entry.
    pub keywords: Vec<String>,
    /// Text spoken and shown as the assistant reply.
    pub response: String,
    /// Drawing keys played in order.
    pub drawings: Vec<String>,
}

/// Keyword and symptom tables. Order of declaration is match order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub keywords: Vec<KeywordEntry>,
    pub symptoms: Vec<SymptomEntry>,
    pub general: SymptomEntry,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// Load a catalog from JSON.
    pub fn load(path: &Path) -> SketchResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SketchError::Catalog(format!("failed to read {}: {}", path.display(), e)))?;
        let mut catalog: Catalog = serde_json::from_str(&content)
            .map_err(|e| SketchError::Catalog(format!("failed to parse {}: {}", path.display(), e)))?;
        catalog.normalize();
        Ok(catalog)
    }

    /// Load from `path` when given, otherwise (or on any failure) use the built-in tables.
    pub fn load_or_builtin(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self::load(p).unwrap_or_else(|err| {
                warn!(error = %err, "catalog override unusable; using built-in tables");
                Self::builtin()
            }),
            None => Self::builtin(),
        }
    }

    /// Lowercase every keyword so matching stays a plain substring test.
    fn normalize(&mut self) {
        for entry in &mut self.keywords {
            entry.keyword = entry.keyword.to_lowercase();
        }
        for entry in self.symptoms.iter_mut().chain(std::iter::once(&mut self.general)) {
            for kw in &mut entry.keywords {
                *kw = kw.to_lowercase();
            }
        }
    }

    pub fn symptom(&self, category: &str) -> Option<&SymptomEntry> {
        if category == self.general.category {
            return Some(&self.general);
        }
        self.symptoms.iter().find(|s| s.category == category)
    }

    /// The built-in probiotic tables.
    pub fn builtin() -> Self {
        let keywords = [
            ("lactobacilo", "lactobacilo"),
            ("bifidobacteria", "bifidobacteria"),
            ("intestino", "intestino"),
            ("fermentación", "fermentacion"),
            ("beneficios", "beneficios"),
            ("digestión", "digestion"),
            ("microbiota", "microbiota"),
            ("probióticos", "probioticos"),
        ]
        .into_iter()
        .map(|(keyword, category)| KeywordEntry {
            keyword: keyword.to_string(),
            category: category.to_string(),
        })
        .collect();

        let symptoms = vec![
            symptom(
                "gases",
                &["gases", "hinchaz", "distensi", "flatulen", "eructo", "barriga llena"],
                "Entiendo, los gases y la hinchazón son muy molestos. Suelen aparecer cuando las \
                 bacterias que fermentan mal los alimentos ganan terreno en tu intestino. \
                 ProBioBalance Plus aporta bacterias beneficiosas que digieren mejor esos restos, \
                 así se produce menos gas y notarás el vientre más ligero en pocos días.",
                &["gases", "bacterias_malas", "probiotico", "bacterias_buenas", "alivio"],
            ),
            symptom(
                "estrenimiento",
                &["estreñ", "estren", "constipa", "no voy al baño", "tránsito lento", "transito lento"],
                "El estreñimiento suele indicar un tránsito intestinal lento. Las cepas de \
                 ProBioBalance Plus ayudan a regular el movimiento del intestino y a ablandar las \
                 heces. Tomando una cápsula al día con alimentos, tu ritmo se vuelve más regular.",
                &["intestino_lento", "probiotico", "bacterias_buenas", "reloj", "alivio"],
            ),
            symptom(
                "diarrea",
                &["diarrea", "heces líquidas", "heces liquidas", "suelto", "descomposici"],
                "La diarrea suele aparecer cuando las bacterias dañinas desplazan a las buenas. \
                 ProBioBalance Plus repone la flora beneficiosa, que compite con los microbios \
                 dañinos y ayuda a que tu intestino recupere su equilibrio.",
                &["bacterias_malas", "batalla", "probiotico", "equilibrio"],
            ),
            symptom(
                "inflamacion",
                &["inflamaci", "colitis", "irritable", "dolor de barriga", "dolor de tripa", "cólico", "colico"],
                "Cuando el intestino está inflamado, su pared se vuelve más sensible. Las bacterias \
                 de ProBioBalance Plus refuerzan esa barrera protectora y calman la irritación \
                 poco a poco.",
                &["intestino_inflamado", "probiotico", "escudo", "intestino", "alivio"],
            ),
            symptom(
                "acidez",
                &["acidez", "reflujo", "ardor", "pesadez", "mala digestión", "mala digestion", "estómago", "estomago"],
                "La pesadez y la acidez indican que la digestión no está funcionando bien. Una flora \
                 equilibrada ayuda a descomponer los alimentos y a absorber mejor los nutrientes, \
                 lo que reduce esa sensación en el estómago.",
                &["estomago", "digestion", "probiotico", "nutrientes", "alivio"],
            ),
            symptom(
                "defensas",
                &["defensas", "inmun", "resfri", "me enfermo", "enfermo mucho", "infecci"],
                "Gran parte de tus defensas vive en el intestino. Al mantener una flora sana, \
                 ProBioBalance Plus ayuda a tu sistema inmune a protegerte mejor.",
                &["intestino", "bacterias_buenas", "defensas", "escudo"],
            ),
            symptom(
                "antibioticos",
                &["antibiótico", "antibiotico"],
                "Los antibióticos eliminan también las bacterias buenas de tu intestino. \
                 ProBioBalance Plus te ayuda a repoblar la flora intestinal para recuperar el \
                 equilibrio cuanto antes.",
                &["bacterias_buenas", "bacterias_malas", "probiotico", "equilibrio"],
            ),
        ];

        let general = symptom(
            GENERAL_CATEGORY,
            &[],
            "ProBioBalance Plus contiene tres cepas de bacterias beneficiosas que restauran el \
             equilibrio de tu flora intestinal. Basta con una cápsula al día con alimentos. \
             ¿Podrías contarme qué molestias tienes?",
            &["probiotico", "intestino", "equilibrio"],
        );

        Self {
            keywords,
            symptoms,
            general,
        }
    }
}

fn symptom(category: &str, keywords: &[&str], response: &str, drawings: &[&str]) -> SymptomEntry {
    SymptomEntry {
        category: category.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        response: response.to_string(),
        drawings: drawings.iter().map(|d| d.to_string()).collect(),
    }
}
