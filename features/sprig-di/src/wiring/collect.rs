use crate::{
    bean::BeanDefinition,
    errors::Error,
    tag::{CollectionTag, WireTag},
};

/// What [`arrange`] needs to know about a collected bean
pub(crate) trait Candidate: Copy {
    fn order(&self) -> i32;
    fn matches(&self, tag: &WireTag) -> bool;
    fn id(&self) -> String;
}

impl Candidate for &BeanDefinition {
    fn order(&self) -> i32 {
        BeanDefinition::order(self)
    }

    fn matches(&self, tag: &WireTag) -> bool {
        tag.matches(self)
    }

    fn id(&self) -> String {
        BeanDefinition::id(self)
    }
}

/// Selects and orders the beans of a collection.
///
/// Without items every candidate is kept, sorted by `order`. Otherwise each
/// item picks one candidate in tag order, and `*` takes the candidates no
/// item named, sorted by `order`. Without `*` unnamed candidates are dropped.
pub(crate) fn arrange<C: Candidate>(
    pool: &[C],
    tag: &CollectionTag,
    type_name: &'static str,
) -> Result<Vec<C>, Error> {
    if tag.items.is_empty() {
        let mut sorted = pool.to_vec();
        sorted.sort_by_key(|candidate| candidate.order());
        return Ok(sorted);
    }

    let mut rest = pool.to_vec();
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut any = false;

    for item in &tag.items {
        if item.is_any() {
            any = true;
            continue;
        }

        let hits: Vec<usize> = rest
            .iter()
            .enumerate()
            .filter(|(_, candidate)| candidate.matches(item))
            .map(|(index, _)| index)
            .collect();

        match hits.as_slice() {
            [] if item.nullable || tag.nullable => {}
            [] => {
                return Err(Error::NoSuchBean {
                    selector: item.to_string(),
                    type_name,
                })
            }
            [hit] => {
                let candidate = rest.remove(*hit);
                if any {
                    after.push(candidate);
                } else {
                    before.push(candidate);
                }
            }
            hits => {
                return Err(Error::AmbiguousBean {
                    selector: item.to_string(),
                    type_name,
                    candidates: hits.iter().map(|hit| rest[*hit].id()).collect(),
                })
            }
        }
    }

    if any {
        rest.sort_by_key(|candidate| candidate.order());
        before.extend(rest);
    }
    before.extend(after);
    Ok(before)
}
