//! Parameter resolution.
//!
//! Configured parameters are merged with caller overrides (overrides win key
//! by key), then every value is scanned for reference expressions:
//!
//! - `${cfn://<stack>/outputs/<OutputKey>}` reads an output of another deployed
//!   stack in the owning stack's region;
//! - `${cfn://<stack>.<region>/outputs/<OutputKey>}` pins the region;
//! - `${env://<NAME>}` reads a process environment variable.
//!
//! Stack names in references are provider (remote) names. Outputs of a
//! referenced stack are fetched at most once per `resolve` call and never kept
//! across calls, since remote state may change between invocations.

use crate::client::StackClientProvider;
use cairn_core::{ResolutionError, ResolvedParameters, StackOutput};
use regex::Regex;
use std::collections::BTreeMap;
use std::env::VarError;
use std::sync::LazyLock;

static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("reference pattern compiles"));

type OutputCache = BTreeMap<(String, Option<String>), Option<Vec<StackOutput>>>;

pub struct ParameterResolver<'a> {
    provider: &'a dyn StackClientProvider,
    region: Option<&'a str>,
}

impl<'a> ParameterResolver<'a> {
    /// `region` is the owning stack's region, used for references that do not
    /// name one.
    pub fn new(provider: &'a dyn StackClientProvider, region: Option<&'a str>) -> Self {
        Self { provider, region }
    }

    /// Right-biased merge: `resolve({a:1,b:2}, {b:3}) == {a:1,b:3}`.
    pub fn merge(base: &ResolvedParameters, overrides: &ResolvedParameters) -> ResolvedParameters {
        let mut merged = base.clone();
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Merge and evaluate every reference expression. Produces a fresh map on
    /// every call.
    pub async fn resolve(
        &self,
        base: &ResolvedParameters,
        overrides: &ResolvedParameters,
    ) -> Result<ResolvedParameters, ResolutionError> {
        let mut cache = OutputCache::new();
        let mut resolved = ResolvedParameters::new();
        for (key, value) in Self::merge(base, overrides) {
            let value = self.resolve_value(&value, &mut cache).await?;
            resolved.insert(key, value);
        }
        Ok(resolved)
    }

    async fn resolve_value(&self, value: &str, cache: &mut OutputCache) -> Result<String, ResolutionError> {
        // Collected up front so no regex state is held across awaits.
        let references: Vec<(usize, usize, String)> = REFERENCE
            .captures_iter(value)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let body = caps.get(1)?;
                Some((whole.start(), whole.end(), body.as_str().to_string()))
            })
            .collect();

        let mut result = String::with_capacity(value.len());
        let mut last = 0;
        for (start, end, body) in references {
            let literal = &value[last..start];
            check_literal(literal)?;
            result.push_str(literal);
            let reference = &value[start..end];
            result.push_str(&self.evaluate(reference, &body, cache).await?);
            last = end;
        }
        let tail = &value[last..];
        check_literal(tail)?;
        result.push_str(tail);
        Ok(result)
    }

    async fn evaluate(
        &self,
        reference: &str,
        body: &str,
        cache: &mut OutputCache,
    ) -> Result<String, ResolutionError> {
        let (scheme, rest) = body.split_once("://").ok_or_else(|| malformed(reference))?;
        match scheme {
            "env" => std::env::var(rest).map_err(|e| match e {
                VarError::NotPresent => ResolutionError::EnvironmentNotSet {
                    reference: reference.to_string(),
                    name: rest.to_string(),
                },
                VarError::NotUnicode(_) => ResolutionError::EnvironmentNotUnicode {
                    reference: reference.to_string(),
                    name: rest.to_string(),
                },
            }),
            "cfn" => self.stack_output(reference, rest, cache).await,
            other => Err(ResolutionError::UnsupportedScheme {
                reference: reference.to_string(),
                scheme: other.to_string(),
            }),
        }
    }

    async fn stack_output(
        &self,
        reference: &str,
        path: &str,
        cache: &mut OutputCache,
    ) -> Result<String, ResolutionError> {
        let parts: Vec<&str> = path.split('/').collect();
        let [stack_part, "outputs", output_key] = parts.as_slice() else {
            return Err(malformed(reference));
        };
        if stack_part.is_empty() || output_key.is_empty() {
            return Err(malformed(reference));
        }

        let (stack, region) = match stack_part.split_once('.') {
            Some((stack, region)) => (stack, Some(region.to_string())),
            None => (*stack_part, self.region.map(str::to_string)),
        };

        let cache_key = (stack.to_string(), region.clone());
        if !cache.contains_key(&cache_key) {
            tracing::debug!(stack = %stack, region = ?region, "Fetching outputs for parameter reference");
            let client = self.provider.client(stack, region.as_deref());
            let outputs = client
                .outputs()
                .await
                .map_err(|source| ResolutionError::Remote {
                    reference: reference.to_string(),
                    source,
                })?;
            cache.insert(cache_key.clone(), outputs);
        }

        let outputs = cache
            .get(&cache_key)
            .and_then(Option::as_ref)
            .ok_or_else(|| ResolutionError::StackNotFound {
                reference: reference.to_string(),
                stack: stack.to_string(),
            })?;

        outputs
            .iter()
            .find(|o| o.key == *output_key)
            .map(|o| o.value.clone())
            .ok_or_else(|| ResolutionError::OutputNotFound {
                reference: reference.to_string(),
                stack: stack.to_string(),
                output: output_key.to_string(),
            })
    }
}

/// A `${` left over outside a complete expression is unterminated.
fn check_literal(literal: &str) -> Result<(), ResolutionError> {
    match literal.find("${") {
        Some(pos) => Err(malformed(&literal[pos..])),
        None => Ok(()),
    }
}

fn malformed(reference: &str) -> ResolutionError {
    ResolutionError::Malformed {
        reference: reference.to_string(),
    }
}
