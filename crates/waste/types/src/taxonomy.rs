//! Material taxonomy: the four waste categories and the material names each accepts.

use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Waste destination category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Recycling,
    Compost,
    Reuse,
    Landfill,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Recycling,
        Category::Compost,
        Category::Reuse,
        Category::Landfill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Recycling => "recycling",
            Category::Compost => "compost",
            Category::Reuse => "reuse",
            Category::Landfill => "landfill",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "recycling" => Ok(Category::Recycling),
            "compost" => Ok(Category::Compost),
            "reuse" => Ok(Category::Reuse),
            "landfill" => Ok(Category::Landfill),
            other => Err(ValidationError::InvalidCategory(other.to_string())),
        }
    }
}

/// Valid material names per category.
///
/// Static configuration. Every category is present and non-empty, and a
/// material name appears at most once within a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<Category, Vec<String>>",
    into = "BTreeMap<Category, Vec<String>>"
)]
pub struct MaterialTaxonomy {
    materials: BTreeMap<Category, Vec<String>>,
}

impl MaterialTaxonomy {
    /// Build a taxonomy from explicit category lists.
    pub fn from_lists(lists: BTreeMap<Category, Vec<String>>) -> Result<Self, ValidationError> {
        for category in Category::ALL {
            let Some(materials) = lists.get(&category) else {
                return Err(ValidationError::InvalidTaxonomy(format!(
                    "category {category} has no material list"
                )));
            };
            if materials.is_empty() {
                return Err(ValidationError::InvalidTaxonomy(format!(
                    "category {category} has an empty material list"
                )));
            }
            let mut seen = BTreeSet::new();
            for material in materials {
                if material.trim().is_empty() {
                    return Err(ValidationError::InvalidTaxonomy(format!(
                        "category {category} contains a blank material name"
                    )));
                }
                if !seen.insert(material.as_str()) {
                    return Err(ValidationError::InvalidTaxonomy(format!(
                        "material `{material}` listed twice under {category}"
                    )));
                }
            }
        }
        Ok(Self { materials: lists })
    }

    /// The standard certification taxonomy.
    pub fn standard() -> Self {
        let list = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();
        let materials = BTreeMap::from([
            (
                Category::Recycling,
                list(&[
                    "Cartón",
                    "Papel",
                    "PET",
                    "Plástico rígido",
                    "Vidrio",
                    "Aluminio",
                    "Metales ferrosos",
                    "Tetrapak",
                ]),
            ),
            (
                Category::Compost,
                list(&[
                    "Residuos orgánicos",
                    "Residuos de poda",
                    "Residuos de cocina",
                    "Posos de café",
                ]),
            ),
            (
                Category::Reuse,
                list(&[
                    "Tarimas de madera",
                    "Contenedores",
                    "Mobiliario",
                    "Equipo electrónico",
                ]),
            ),
            (
                Category::Landfill,
                list(&[
                    "Residuos sanitarios",
                    "Inorgánicos no reciclables",
                    "Unicel",
                    "Basura general",
                ]),
            ),
        ]);
        Self { materials }
    }

    pub fn materials(&self, category: Category) -> &[String] {
        self.materials
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, category: Category, material: &str) -> bool {
        self.materials(category).iter().any(|m| m == material)
    }

    pub fn validate(&self, category: Category, material: &str) -> Result<(), ValidationError> {
        if self.contains(category, material) {
            Ok(())
        } else {
            Err(ValidationError::InvalidMaterial {
                category,
                material: material.to_string(),
            })
        }
    }

    /// Every `(category, material)` pair in category order, then list order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str)> + '_ {
        self.materials
            .iter()
            .flat_map(|(category, names)| names.iter().map(move |n| (*category, n.as_str())))
    }
}

impl Default for MaterialTaxonomy {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<BTreeMap<Category, Vec<String>>> for MaterialTaxonomy {
    type Error = ValidationError;

    fn try_from(lists: BTreeMap<Category, Vec<String>>) -> Result<Self, Self::Error> {
        Self::from_lists(lists)
    }
}

impl From<MaterialTaxonomy> for BTreeMap<Category, Vec<String>> {
    fn from(taxonomy: MaterialTaxonomy) -> Self {
        taxonomy.materials
    }
}
