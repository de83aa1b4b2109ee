use {
    ndarray::Array3,
    rayon::prelude::*,
    serde::{Deserialize, Serialize},
};

/// Field storage owned by a model, in registration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelState {
    fields: Vec<(String, Array3<f64>)>,
}

impl ModelState {
    pub(super) fn insert(&mut self, name: &str, field: Array3<f64>) {
        self.fields.push((name.to_owned(), field));
    }

    pub fn get(&self, name: &str) -> Option<&Array3<f64>> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Array3<f64>> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Array3<f64>)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Name of the first field holding a NaN or infinite value
    pub fn first_non_finite(&self) -> Option<&str> {
        self.fields
            .par_iter()
            .find_first(|(_, field)| field.iter().any(|x| !x.is_finite()))
            .map(|(n, _)| n.as_str())
    }

    /// Largest absolute value of a field, or `None` if the field does not exist
    pub fn max_abs(&self, name: &str) -> Option<f64> {
        self.get(name)
            .map(|f| f.iter().fold(0.0_f64, |acc, x| acc.max(x.abs())))
    }
}
