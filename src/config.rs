//! Options of the grounding and translation pipeline.
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, EnumString, EnumVariantNames};

/// How the boolean propositions are packed into multi-valued variables
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    EnumVariantNames,
    Display,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SplitStrategy {
    /// Greedy mutex cliques grown from every unassigned proposition
    #[default]
    Cliques,
    /// Connected components of the mutex graph, bisected until every part is a clique
    Components,
}

/// Configuration of [translate][crate::translator::translate] and [ground][crate::grounder::ground]
#[derive(Derivative, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derivative(Debug, Default)]
#[serde(default)]
pub struct Config {
    /// Keep the variables that never change
    pub keep_static_data: bool,
    /// Only compute the mutexes; every proposition becomes its own boolean variable
    pub only_generate_mutex: bool,
    /// Write the mutex pairs to [Config::mutex_file]
    pub generate_mutex_file: bool,
    /// Target of the mutex dump
    #[derivative(Default(value = "PathBuf::from(\"mutex.txt\")"))]
    pub mutex_file: PathBuf,
    /// Strategy used to group the propositions
    pub split: SplitStrategy,
    /// Maximal number of passes of the mutex fixpoint
    #[derivative(Default(value = "10_000"))]
    pub mutex_pass_limit: usize,
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    use strum::VariantNames;
    use test_log::test;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(!config.keep_static_data);
        assert!(!config.only_generate_mutex);
        assert!(!config.generate_mutex_file);
        assert_eq!(config.mutex_file, PathBuf::from("mutex.txt"));
        assert_eq!(config.split, SplitStrategy::Cliques);
        assert_eq!(config.mutex_pass_limit, 10_000);

        let partial: Config = serde_json::from_str(r#"{"keep_static_data":true}"#).unwrap();
        assert!(partial.keep_static_data);
        assert_eq!(partial.mutex_pass_limit, 10_000);
    }

    #[test]
    fn split_names() {
        assert_eq!(SplitStrategy::VARIANTS, &["cliques", "components"]);
        assert_eq!(
            SplitStrategy::from_str("components").unwrap(),
            SplitStrategy::Components
        );
        assert!(SplitStrategy::from_str("random").is_err());
        assert_eq!(format!("{}", SplitStrategy::Cliques), "cliques");
    }
}
