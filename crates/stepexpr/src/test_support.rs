//! Shared fixtures for unit tests.

use std::any::Any;

use unic_langid::{LanguageIdentifier, langid};

use crate::registry::{AssertionCapability, AssertionRegistry, DataType, DataTypeRegistry};

/// Outcome recorded by the fixture capability's builders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusCheck {
    Running,
    Stopped { minutes: u32 },
}

pub(crate) fn english() -> LanguageIdentifier {
    langid!("en-US")
}

pub(crate) fn number_type() -> DataType {
    let built = DataType::new(
        "number",
        r"[+-]?\d+",
        Box::new(|raw| {
            raw.parse::<i64>()
                .map(|value| Box::new(value) as Box<dyn Any>)
                .map_err(|err| err.to_string())
        }),
    );
    built.unwrap_or_else(|err| panic!("number pattern must compile: {err}"))
}

pub(crate) fn digits_type() -> DataType {
    let built = DataType::new(
        "digits",
        r"\d+",
        Box::new(|raw| {
            raw.parse::<i64>()
                .map(|value| Box::new(value) as Box<dyn Any>)
                .map_err(|err| err.to_string())
        }),
    );
    built.unwrap_or_else(|err| panic!("digits pattern must compile: {err}"))
}

pub(crate) fn word_type() -> DataType {
    let built = DataType::new(
        "word",
        r"[A-Za-z]+",
        Box::new(|raw| Ok(Box::new(raw.to_string()) as Box<dyn Any>)),
    );
    built.unwrap_or_else(|err| panic!("word pattern must compile: {err}"))
}

pub(crate) fn sample_types() -> DataTypeRegistry {
    let mut registry = DataTypeRegistry::new();
    registry.register(number_type());
    registry.register(digits_type());
    registry.register(word_type());
    registry
}

pub(crate) fn sample_assertions() -> AssertionRegistry {
    let capability = AssertionCapability::new("status-assertion")
        .with_pattern(
            english(),
            "up and running",
            Box::new(|_| Box::new(StatusCheck::Running) as Box<dyn Any>),
        )
        .and_then(|capability| {
            capability.with_pattern(
                english(),
                r"stopped for (\d+) minutes",
                Box::new(|parameter| {
                    let minutes = parameter
                        .and_then(|text| text.parse::<u32>().ok())
                        .unwrap_or_default();
                    Box::new(StatusCheck::Stopped { minutes }) as Box<dyn Any>
                }),
            )
        });
    let capability =
        capability.unwrap_or_else(|err| panic!("status patterns must compile: {err}"));

    let mut registry = AssertionRegistry::new();
    registry.register(capability);
    registry
}
