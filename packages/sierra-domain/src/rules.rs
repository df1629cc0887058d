//! Ruleset version values: the query-rewriting rules a ruleset carries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Instruction {
	Synonym {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		weight: Option<f64>,
		directed: bool,
		term: String,
		enabled: bool,
	},
	UpDown {
		weight: f64,
		term: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		query: Option<String>,
		enabled: bool,
	},
	Filter {
		include: bool,
		term: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		query: Option<String>,
		enabled: bool,
	},
	Delete {
		term: String,
		enabled: bool,
	},
}
impl Instruction {
	pub fn enabled(&self) -> bool {
		match self {
			Self::Synonym { enabled, .. }
			| Self::UpDown { enabled, .. }
			| Self::Filter { enabled, .. }
			| Self::Delete { enabled, .. } => *enabled,
		}
	}

	fn weight(&self) -> Option<f64> {
		match self {
			Self::Synonym { weight, .. } => *weight,
			Self::UpDown { weight, .. } => Some(*weight),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
	pub expression: String,
	pub instructions: Vec<Instruction>,
	pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesetVersionValue {
	pub rules: Vec<Rule>,
}
impl RulesetVersionValue {
	/// Returns the JSON path of the first invalid field, if any.
	pub fn validate(&self) -> Result<(), String> {
		for (rule_index, rule) in self.rules.iter().enumerate() {
			for (index, instruction) in rule.instructions.iter().enumerate() {
				if let Some(weight) = instruction.weight()
					&& !weight.is_finite()
				{
					return Err(format!(
						"$.value.rules[{rule_index}].instructions[{index}].weight must be finite."
					));
				}
			}
		}

		Ok(())
	}

	/// Rules handed to the query expander: disabled rules and disabled instructions are dropped.
	pub fn enabled_rules(&self) -> Vec<Rule> {
		self.rules
			.iter()
			.filter(|rule| rule.enabled)
			.map(|rule| Rule {
				expression: rule.expression.clone(),
				instructions: rule
					.instructions
					.iter()
					.filter(|instruction| instruction.enabled())
					.cloned()
					.collect(),
				enabled: true,
			})
			.collect()
	}
}
