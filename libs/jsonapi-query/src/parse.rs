//! Query-string interpretation.
//!
//! Recognized families: `fields[<type>]`, `include`, `sort`, `filter`,
//! `filter[<field>]`, `page[number]`, `page[size]`. Everything else is left
//! to the caller.

use std::collections::BTreeSet;

use crate::{
    Error, FilterClause, Pagination, QueryLimits, QueryOptions, ResourceCatalog, SortDir, SortKey,
};

/// Value of a bracketed key such as `fields[student]`
fn bracketed<'a>(key: &'a str, family: &str) -> Option<&'a str> {
    key.strip_prefix(family)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

fn csv(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn parse_page_value(parameter: &str, value: &str) -> Result<u64, Error> {
    value.trim().parse::<u64>().map_err(|_| Error::InvalidPage {
        parameter: parameter.to_owned(),
        detail: format!("\"{parameter}\" must be a non-negative integer, got \"{value}\""),
    })
}

impl QueryOptions {
    /// Parse a raw query string (`a=1&b=2`, without the leading `?`).
    ///
    /// # Errors
    /// See [`QueryOptions::parse`].
    pub fn parse_query_str<C>(
        query: &str,
        resource_type: &str,
        catalog: &C,
        limits: &QueryLimits,
    ) -> Result<Self, Error>
    where
        C: ResourceCatalog + ?Sized,
    {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self::parse(&pairs, resource_type, catalog, limits)
    }

    /// Build validated options for a request targeting `resource_type`.
    ///
    /// Repeated comma-separated families accumulate; repeated `page[..]` keys
    /// keep the last value.
    ///
    /// # Errors
    /// - `InvalidFields` for an unknown type or field in `fields[..]`
    /// - `InvalidInclude` for a path segment that is not a relationship
    /// - `InvalidSort` for an unknown sort field
    /// - `InvalidFilters` for an unparsable clause or unknown filter field
    /// - `InvalidPage` for a non-numeric, zero or oversized page parameter
    pub fn parse<C>(
        pairs: &[(String, String)],
        resource_type: &str,
        catalog: &C,
        limits: &QueryLimits,
    ) -> Result<Self, Error>
    where
        C: ResourceCatalog + ?Sized,
    {
        let mut options = QueryOptions {
            pagination: Pagination::new(0, limits.default_page_size),
            ..QueryOptions::default()
        };

        for (key, value) in pairs {
            let key = key.as_str();
            if let Some(fields_type) = bracketed(key, "fields") {
                parse_fieldset(&mut options, fields_type, value, catalog)?;
            } else if key == "fields" {
                return Err(Error::InvalidFields(
                    "Sparse fieldsets must be given as fields[<type>]".to_owned(),
                ));
            } else if key == "include" {
                parse_include(&mut options, value, resource_type, catalog, limits)?;
            } else if key == "sort" {
                parse_sort(&mut options, value, resource_type, catalog)?;
            } else if key == "filter" {
                limits.validate_filter(value)?;
                for clause in FilterClause::parse_json(value)? {
                    check_filter_field(&clause.field, resource_type, catalog)?;
                    options.filters.push(clause);
                }
            } else if let Some(field) = bracketed(key, "filter") {
                limits.validate_filter(value)?;
                check_filter_field(field, resource_type, catalog)?;
                options.filters.push(FilterClause::eq(field, value.as_str()));
            } else if let Some(page_key) = bracketed(key, "page") {
                match page_key {
                    "number" => options.pagination.number = parse_page_value(key, value)?,
                    "size" => options.pagination.size = parse_page_value(key, value)?,
                    _ => {
                        return Err(Error::InvalidPage {
                            parameter: "page".to_owned(),
                            detail: format!("Unknown pagination parameter \"{key}\""),
                        });
                    }
                }
            }
        }

        limits.validate_sort_count(options.sort.len())?;
        limits.validate_page_size(options.pagination.size)?;
        Ok(options)
    }
}

fn parse_fieldset<C>(
    options: &mut QueryOptions,
    fields_type: &str,
    value: &str,
    catalog: &C,
) -> Result<(), Error>
where
    C: ResourceCatalog + ?Sized,
{
    if !catalog.contains_type(fields_type) {
        return Err(Error::InvalidFields(format!(
            "Unknown resource type \"{fields_type}\""
        )));
    }
    let set = options.fields.entry(fields_type.to_owned()).or_insert_with(BTreeSet::new);
    for field in csv(value) {
        if !catalog.has_field(fields_type, field) {
            return Err(Error::InvalidFields(format!(
                "\"{fields_type}\" has no field \"{field}\""
            )));
        }
        set.insert(field.to_owned());
    }
    Ok(())
}

fn parse_include<C>(
    options: &mut QueryOptions,
    value: &str,
    resource_type: &str,
    catalog: &C,
    limits: &QueryLimits,
) -> Result<(), Error>
where
    C: ResourceCatalog + ?Sized,
{
    for path in csv(value) {
        limits.validate_include_depth(path)?;
        let mut current = resource_type;
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(Error::InvalidInclude(format!(
                    "Include path \"{path}\" has an empty segment"
                )));
            }
            current = catalog.related_type(current, segment).ok_or_else(|| {
                Error::InvalidInclude(format!("\"{current}\" has no relationship \"{segment}\""))
            })?;
        }
        if !options.include.iter().any(|p| p == path) {
            options.include.push(path.to_owned());
        }
    }
    Ok(())
}

fn parse_sort<C>(
    options: &mut QueryOptions,
    value: &str,
    resource_type: &str,
    catalog: &C,
) -> Result<(), Error>
where
    C: ResourceCatalog + ?Sized,
{
    for token in csv(value) {
        let (dir, name) = match token.strip_prefix('-') {
            Some(rest) => (SortDir::Desc, rest),
            None => (SortDir::Asc, token.strip_prefix('+').unwrap_or(token)),
        };
        if name.is_empty() {
            return Err(Error::InvalidSort(format!("Invalid sort token \"{token}\"")));
        }
        if !catalog.has_attribute(resource_type, name) {
            return Err(Error::InvalidSort(format!(
                "\"{resource_type}\" has no attribute \"{name}\""
            )));
        }
        options.sort.push(SortKey {
            field: name.to_owned(),
            dir,
        });
    }
    Ok(())
}

fn check_filter_field<C>(field: &str, resource_type: &str, catalog: &C) -> Result<(), Error>
where
    C: ResourceCatalog + ?Sized,
{
    if catalog.has_attribute(resource_type, field) {
        Ok(())
    } else {
        Err(Error::InvalidFilters(format!(
            "\"{resource_type}\" has no attribute \"{field}\""
        )))
    }
}
