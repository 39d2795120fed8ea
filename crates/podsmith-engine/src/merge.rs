//! Ordered map merge
//!
//! Every place where layered labels or annotations collapse into one map goes
//! through [`merge`]: layers are applied left to right and on a key collision
//! the rightmost layer wins. Absent layers are skipped.

use podsmith_core::LabelMap;

/// Merge `layers` left to right, the last value for a key wins
pub fn merge<'a, I>(layers: I) -> LabelMap
where
    I: IntoIterator<Item = Option<&'a LabelMap>>,
{
    let mut merged = LabelMap::new();
    for layer in layers.into_iter().flatten() {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Build a map from static pairs
pub fn labels<const N: usize>(pairs: [(&str, String); N]) -> LabelMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_layer_wins() {
        let base = labels([("app", "a".to_string()), ("team", "core".to_string())]);
        let overlay = labels([("app", "b".to_string())]);

        let merged = merge([Some(&base), Some(&overlay)]);

        assert_eq!(merged["app"], "b");
        assert_eq!(merged["team"], "core");
    }

    #[test]
    fn test_absent_and_empty_layers() {
        let only = labels([("app", "a".to_string())]);
        let empty = LabelMap::new();

        let merged = merge([None, Some(&empty), Some(&only), None]);

        assert_eq!(merged, only);
        assert!(merge([None, None]).is_empty());
    }

    #[test]
    fn test_three_layers_precedence() {
        let a = labels([("k", "1".to_string())]);
        let b = labels([("k", "2".to_string()), ("x", "b".to_string())]);
        let c = labels([("k", "3".to_string())]);

        let merged = merge([Some(&a), Some(&b), Some(&c)]);

        assert_eq!(merged["k"], "3");
        assert_eq!(merged["x"], "b");
    }
}
