//! Product category classification.

use crate::error::PricingError;
use crate::invoice::rules::collapse_whitespace;
use crate::models::pricing::{Category, CategoryClassification};

/// Words that carry no category signal.
const NOISE_WORDS: [&str; 6] = ["ref", "codigo", "item", "producto", "unidad", "pieza"];

/// Confidence when nothing matched.
const GENERAL_CONFIDENCE: f32 = 0.60;

/// Confidence for an empty description.
const EMPTY_CONFIDENCE: f32 = 0.50;

/// Capability that guesses a product category from its description.
pub trait CategoryClassifier {
    fn classify(&self, description: &str) -> Result<CategoryClassification, PricingError>;
}

/// Keyword list for one category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryKeywords {
    pub category: Category,
    pub keywords: &'static [&'static str],
    pub confidence: f32,
}

/// Spanish retail keyword lists, in tie-break order.
pub const DEFAULT_KEYWORDS: [CategoryKeywords; 7] = [
    CategoryKeywords {
        category: Category::Shoes,
        keywords: &[
            "zapato", "calzado", "sandalia", "bota", "tenis", "chancleta", "chancla", "mocasin",
            "tacón", "deportivo", "formal", "casual", "nike", "adidas", "converse", "puma", "crocs",
        ],
        confidence: 0.90,
    },
    CategoryKeywords {
        category: Category::Clothing,
        keywords: &[
            "camiseta", "camisa", "pantalon", "vestido", "falda", "sudadera", "chaqueta", "blusa",
            "short", "jean", "algodón", "polyester", "talla", "manga", "cuello", "polo", "hoodie",
        ],
        confidence: 0.85,
    },
    CategoryKeywords {
        category: Category::Electronics,
        keywords: &[
            "telefono", "celular", "computador", "tablet", "audifonos", "parlante", "cargador",
            "cable", "usb", "bluetooth", "wifi", "samsung", "apple", "xiaomi", "huawei", "iphone",
            "android",
        ],
        confidence: 0.95,
    },
    CategoryKeywords {
        category: Category::Sports,
        keywords: &[
            "pelota", "balon", "deporte", "gimnasio", "ejercicio", "fitness", "pesa", "yoga",
            "natacion", "futbol", "basketball", "tenis", "mancuerna", "banda", "colchoneta",
        ],
        confidence: 0.88,
    },
    CategoryKeywords {
        category: Category::Beauty,
        keywords: &[
            "crema", "shampoo", "perfume", "maquillaje", "labial", "base", "mascarilla", "serum",
            "locion", "gel", "jabon", "cosmetico", "skincare", "facial",
        ],
        confidence: 0.92,
    },
    CategoryKeywords {
        category: Category::Accessories,
        keywords: &[
            "collar", "pulsera", "reloj", "gafas", "bolsa", "cartera", "cinturon", "sombrero",
            "gorra", "lentes", "anillo", "arete",
        ],
        confidence: 0.87,
    },
    CategoryKeywords {
        category: Category::Home,
        keywords: &[
            "mesa", "silla", "sofa", "cama", "lampara", "cortina", "almohada", "sabana", "toalla",
            "cocina", "baño", "decoracion", "organizador", "estante",
        ],
        confidence: 0.80,
    },
];

/// Keyword-count classifier.
///
/// The category with the most keyword hits wins; earlier lists win ties.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    lists: Vec<CategoryKeywords>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self {
            lists: DEFAULT_KEYWORDS.to_vec(),
        }
    }
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier over custom keyword lists.
    pub fn with_lists(lists: Vec<CategoryKeywords>) -> Self {
        Self { lists }
    }

    /// Lower-case, collapse whitespace and drop noise words.
    pub fn clean_description(description: &str) -> String {
        collapse_whitespace(&description.to_lowercase())
            .split(' ')
            .filter(|w| !NOISE_WORDS.contains(w))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl CategoryClassifier for KeywordClassifier {
    fn classify(&self, description: &str) -> Result<CategoryClassification, PricingError> {
        let text = Self::clean_description(description);
        if text.is_empty() {
            return Ok(CategoryClassification {
                category: Category::General,
                confidence: EMPTY_CONFIDENCE,
                margin_percentage: Category::General.default_margin(),
                method: "default".to_string(),
            });
        }

        let mut best: Option<(&CategoryKeywords, usize)> = None;
        for list in &self.lists {
            let hits = list.keywords.iter().filter(|k| text.contains(*k)).count();
            if hits > best.map_or(0, |(_, h)| h) {
                best = Some((list, hits));
            }
        }

        let (category, confidence) = match best {
            Some((list, _)) => (list.category, list.confidence),
            None => (Category::General, GENERAL_CONFIDENCE),
        };

        Ok(CategoryClassification {
            category,
            confidence,
            margin_percentage: category.default_margin(),
            method: "keyword".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_keywords() {
        let classifier = KeywordClassifier::new();

        let shoes = classifier.classify("CHANCLA RAJADO DAMA 36-40").unwrap();
        assert_eq!(shoes.category, Category::Shoes);
        assert_eq!(shoes.confidence, 0.90);
        assert_eq!(shoes.margin_percentage, rust_decimal::Decimal::from(55));

        let phone = classifier.classify("Cargador USB Samsung").unwrap();
        assert_eq!(phone.category, Category::Electronics);
        assert_eq!(phone.method, "keyword");
    }

    #[test]
    fn test_classify_ties_go_to_earlier_list() {
        let classifier = KeywordClassifier::new();
        let result = classifier.classify("TENIS").unwrap();
        assert_eq!(result.category, Category::Shoes);
    }

    #[test]
    fn test_classify_general_and_empty() {
        let classifier = KeywordClassifier::new();

        let general = classifier.classify("TORNILLO 3/8").unwrap();
        assert_eq!(general.category, Category::General);
        assert_eq!(general.confidence, 0.60);

        let empty = classifier.classify("  REF  item ").unwrap();
        assert_eq!(empty.category, Category::General);
        assert_eq!(empty.confidence, 0.50);
        assert_eq!(empty.method, "default");
    }

    #[test]
    fn test_clean_description() {
        assert_eq!(
            KeywordClassifier::clean_description("REF  Camiseta   POLO producto"),
            "camiseta polo"
        );
    }
}
