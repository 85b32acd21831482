//! Built-in PlantVillage labels and the disease reference table.

use crate::diagnosis::{DiseaseRecord, DiseaseTable};

/// Separates the crop from the condition in a class name, e.g. `Apple___Black_rot`.
pub const CATEGORY_SEPARATOR: &str = "___";

pub const HEALTHY_KEY: &str = "healthy";

pub const CLASS_NAMES: [&str; 38] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Blueberry___healthy",
    "Cherry_(including_sour)___Powdery_mildew",
    "Cherry_(including_sour)___healthy",
    "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn_(maize)___Common_rust_",
    "Corn_(maize)___Northern_Leaf_Blight",
    "Corn_(maize)___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Grape___healthy",
    "Orange___Haunglongbing_(Citrus_greening)",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Raspberry___healthy",
    "Soybean___healthy",
    "Squash___Powdery_mildew",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

struct Entry {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    remedies: [&'static str; 4],
}

// Order matters: suffix matching takes the first hit.
const ENTRIES: [Entry; 13] = [
    Entry {
        key: "Apple___Apple_scab",
        name: "Apple Scab",
        description: "A fungal disease that causes dark, scaly lesions on leaves and fruits.",
        remedies: [
            "Apply fungicides containing myclobutanil or captan",
            "Prune trees to improve air circulation",
            "Remove and destroy fallen leaves in autumn to reduce spore spread",
            "Plant resistant varieties like Liberty or Enterprise",
        ],
    },
    Entry {
        key: "Apple___Black_rot",
        name: "Apple Black Rot",
        description: "A fungal disease causing fruit rot and leaf spots.",
        remedies: [
            "Remove and destroy infected fruits and branches",
            "Apply fungicides during bloom period",
            "Practice good sanitation by cleaning up fallen fruit and leaves",
            "Ensure proper spacing between trees for air circulation",
        ],
    },
    Entry {
        key: "Apple___Cedar_apple_rust",
        name: "Cedar Apple Rust",
        description:
            "A fungal disease that requires both apple and cedar trees to complete its life cycle.",
        remedies: [
            "Remove nearby juniper/cedar trees if possible",
            "Apply fungicides in early spring when buds break",
            "Plant resistant varieties like William's Pride or Freedom",
            "Use protective fungicides containing myclobutanil or fenarimol",
        ],
    },
    Entry {
        key: "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
        name: "Gray Leaf Spot",
        description: "A fungal disease causing rectangular lesions on corn leaves.",
        remedies: [
            "Plant resistant hybrids",
            "Practice crop rotation with non-host crops",
            "Apply fungicides when disease first appears",
            "Till crop residue to reduce fungal survival",
        ],
    },
    Entry {
        key: "Corn_(maize)___Common_rust_",
        name: "Common Rust of Corn",
        description: "A fungal disease causing pustules on leaves that reduce photosynthesis.",
        remedies: [
            "Plant resistant hybrids",
            "Apply fungicides when disease first appears",
            "Practice crop rotation with non-host crops",
            "Ensure proper plant spacing for air movement",
        ],
    },
    Entry {
        key: "Corn_(maize)___Northern_Leaf_Blight",
        name: "Northern Corn Leaf Blight",
        description: "A fungal disease causing long, elliptical gray-green lesions on leaves.",
        remedies: [
            "Plant resistant hybrids",
            "Practice crop rotation",
            "Apply fungicides during vegetative growth stages",
            "Manage crop residue to reduce inoculum",
        ],
    },
    Entry {
        key: "Tomato___Early_blight",
        name: "Tomato Early Blight",
        description: "A common fungal disease causing target-like lesions on leaves.",
        remedies: [
            "Apply copper-based fungicides or chlorothalonil",
            "Mulch around plants to prevent soil splashing",
            "Remove and destroy infected plant parts",
            "Practice crop rotation (avoid planting tomatoes in same spot for 2-3 years)",
        ],
    },
    Entry {
        key: "Tomato___Late_blight",
        name: "Tomato Late Blight",
        description: "A devastating fungal disease that can destroy entire crops quickly.",
        remedies: [
            "Apply fungicides containing chlorothalonil or mancozeb preventatively",
            "Remove and destroy infected plants immediately",
            "Avoid overhead watering to reduce leaf wetness",
            "Choose resistant varieties when available",
        ],
    },
    Entry {
        key: "Tomato___Septoria_leaf_spot",
        name: "Septoria Leaf Spot",
        description: "A fungal disease causing small circular spots with dark borders on leaves.",
        remedies: [
            "Apply copper-based fungicides or chlorothalonil",
            "Remove infected leaves as soon as symptoms appear",
            "Avoid overhead watering",
            "Mulch around plants to prevent soil splashing",
        ],
    },
    Entry {
        key: "Potato___Early_blight",
        name: "Potato Early Blight",
        description: "A fungal disease causing concentric rings on leaves and stems.",
        remedies: [
            "Apply fungicides containing chlorothalonil or mancozeb",
            "Practice crop rotation (3-year rotation recommended)",
            "Use certified disease-free seed potatoes",
            "Ensure proper nutrition, especially nitrogen",
        ],
    },
    Entry {
        key: "Potato___Late_blight",
        name: "Potato Late Blight",
        description:
            "The same disease that caused the Irish Potato Famine, causing rapid plant destruction.",
        remedies: [
            "Apply fungicides preventatively during favorable weather conditions",
            "Destroy infected plants and tubers immediately",
            "Plant resistant varieties when available",
            "Ensure proper drainage and avoid overhead irrigation",
        ],
    },
    Entry {
        key: "Grape___Black_rot",
        name: "Grape Black Rot",
        description:
            "A fungal disease causing dark, circular lesions on leaves and fruit mummification.",
        remedies: [
            "Apply fungicides from bud break through fruit development",
            "Prune vines to improve air circulation",
            "Remove and destroy mummified fruits",
            "Sanitize pruning tools between plants",
        ],
    },
    Entry {
        key: HEALTHY_KEY,
        name: "Healthy Plant",
        description: "Your plant appears to be healthy with no signs of disease.",
        remedies: [
            "Continue current care practices",
            "Monitor regularly for early signs of problems",
            "Practice crop rotation to maintain soil health",
            "Maintain proper spacing between plants for air circulation",
        ],
    },
];

const UNMATCHED: Entry = Entry {
    key: "",
    name: "Plant Health Issue Detected",
    description: "We've detected a plant health issue but specific information is limited \
                  for this particular disease.",
    remedies: [
        "Remove and destroy severely infected plant parts",
        "Improve air circulation around plants",
        "Avoid overhead watering to reduce leaf wetness",
        "Consult with local agricultural extension service for specific recommendations",
    ],
};

impl Entry {
    fn record(&self) -> DiseaseRecord {
        DiseaseRecord {
            name: self.name.to_string(),
            description: self.description.to_string(),
            remedies: self.remedies.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn default_labels() -> Vec<String> {
    CLASS_NAMES.iter().map(ToString::to_string).collect()
}

pub fn disease_table() -> DiseaseTable {
    DiseaseTable::new(
        ENTRIES
            .iter()
            .map(|entry| (entry.key.to_string(), entry.record()))
            .collect(),
        UNMATCHED.record(),
    )
}

/// Reads one label per line, skipping blanks. Falls back to the built-in
/// list when the file is missing or empty.
pub fn load_labels(path: &str) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let labels: Vec<String> = contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();

            if labels.is_empty() {
                tracing::warn!("{} is empty, using built-in class names", path);
                default_labels()
            } else {
                labels
            }
        }
        Err(err) => {
            tracing::info!("Using built-in class names ({}: {})", path, err);
            default_labels()
        }
    }
}
