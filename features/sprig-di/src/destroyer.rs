use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

/// Destroy-order constraints recorded while beans are wired.
///
/// Entering a bean with a destroy hook while another one is being wired
/// means the outer bean depends on it, so the outer bean must be destroyed
/// first.
#[derive(Debug, Default)]
pub(crate) struct Destroyers {
    nodes: Vec<Node>,
    index: HashMap<usize, usize>,
    /// Beans with destroy hooks currently on the wiring path
    stack: Vec<usize>,
}

#[derive(Debug)]
struct Node {
    bean: usize,
    /// Beans destroyed before this one
    earlier: HashSet<usize>,
}

impl Destroyers {
    pub(crate) fn enter(&mut self, bean: usize) {
        let node = match self.index.get(&bean) {
            Some(node) => *node,
            None => {
                self.nodes.push(Node {
                    bean,
                    earlier: HashSet::new(),
                });
                self.index.insert(bean, self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };

        if let Some(&top) = self.stack.last() {
            if top != bean {
                self.nodes[node].earlier.insert(top);
            }
        }
        self.stack.push(bean);
    }

    pub(crate) fn exit(&mut self) {
        self.stack.pop();
    }

    /// Destroy order, or the beans forming a cycle
    pub(crate) fn order(&self) -> Result<Vec<usize>, Vec<usize>> {
        let items: Vec<usize> = self.nodes.iter().map(|node| node.bean).collect();
        let earlier: HashMap<usize, Vec<usize>> = self
            .nodes
            .iter()
            .map(|node| {
                let mut earlier: Vec<usize> = node.earlier.iter().copied().collect();
                earlier.sort_unstable();
                (node.bean, earlier)
            })
            .collect();

        triple_sort(&items, |item| earlier.get(item).map_or(&[][..], Vec::as_slice))
    }
}

/// Orders `items` so that each one comes after everything in its `earlier`
/// set, keeping the input order where no constraint applies.
///
/// Items reached through `earlier` that are not in `items` are placed too.
pub(crate) fn triple_sort<'a, T, F>(items: &[T], earlier: F) -> Result<Vec<T>, Vec<T>>
where
    T: Copy + Eq + Hash + 'a,
    F: Fn(&T) -> &'a [T],
{
    let mut sorted = Vec::with_capacity(items.len());
    let mut placed = HashSet::new();
    let mut visiting = Vec::new();

    for item in items {
        place(*item, &earlier, &mut sorted, &mut placed, &mut visiting)?;
    }

    return Ok(sorted);

    fn place<'a, T, F>(
        item: T,
        earlier: &F,
        sorted: &mut Vec<T>,
        placed: &mut HashSet<T>,
        visiting: &mut Vec<T>,
    ) -> Result<(), Vec<T>>
    where
        T: Copy + Eq + Hash + 'a,
        F: Fn(&T) -> &'a [T],
    {
        if placed.contains(&item) {
            return Ok(());
        }
        if let Some(start) = visiting.iter().position(|v| *v == item) {
            let mut cycle = visiting[start..].to_vec();
            cycle.push(item);
            return Err(cycle);
        }

        visiting.push(item);
        for before in earlier(&item) {
            place(*before, earlier, sorted, placed, visiting)?;
        }
        visiting.pop();

        placed.insert(item);
        sorted.push(item);
        Ok(())
    }
}
