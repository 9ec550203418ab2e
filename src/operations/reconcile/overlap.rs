use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::error::Result;
use crate::kernel::GeometryKernel;
use crate::topology::{DimTag, Part};

/// Removes the children of the symmetry trim from the model and from every
/// part, then drops the parts left without children.
///
/// Returns `(kept, dropped)`, both in input order.
///
/// # Errors
///
/// Returns an error if the kernel fails to remove the trimmed volumes.
pub fn strip_symmetry_children<K>(
    kernel: &mut K,
    parts: Vec<Part>,
    trimmed: &[DimTag],
) -> Result<(Vec<Part>, Vec<Part>)>
where
    K: GeometryKernel + ?Sized,
{
    if !trimmed.is_empty() {
        kernel.remove(trimmed, true)?;
        kernel.synchronize()?;
    }

    let trimmed: BTreeSet<DimTag> = trimmed.iter().copied().collect();
    let mut parts = parts;
    for part in &mut parts {
        part.children.retain(|child| !trimmed.contains(child));
    }

    let (kept, dropped): (Vec<Part>, Vec<Part>) = parts
        .into_iter()
        .partition(|part| !part.children.is_empty());
    for part in &dropped {
        if trimmed.is_empty() {
            warn!("{} has no children after the fragment, dropped", part.uid);
        } else {
            info!("{} has no children left after the symmetry trim, dropped", part.uid);
        }
    }
    Ok((kept, dropped))
}

/// Removes every child claimed by more than one part from all of them.
///
/// Such children are the overlap of two input solids. Returns them sorted.
pub fn extract_shared_children(parts: &mut [Part]) -> Vec<DimTag> {
    let mut owners: BTreeMap<DimTag, usize> = BTreeMap::new();
    for part in parts.iter() {
        for child in &part.children {
            *owners.entry(*child).or_default() += 1;
        }
    }
    let shared: Vec<DimTag> = owners
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(child, _)| child)
        .collect();

    for part in parts.iter_mut() {
        part.children.retain(|child| shared.binary_search(child).is_err());
    }
    shared
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::kernel::memory::MemorySession;
    use crate::math::Point3;
    use crate::topology::{Dim, PartType};

    fn part(uid: &str, children: &[i32]) -> Part {
        let mut part = Part::new(uid, PartType::Other);
        part.children = children.iter().map(|&t| DimTag::volume(t)).collect();
        part
    }

    #[test]
    fn shared_children_leave_every_owner() {
        let mut parts = vec![part("a", &[1, 2]), part("b", &[2, 3]), part("c", &[2, 4, 5])];
        let shared = extract_shared_children(&mut parts);

        assert_eq!(shared, vec![DimTag::volume(2)]);
        assert_eq!(parts[0].children.len(), 1);
        assert_eq!(parts[1].children.len(), 1);
        assert_eq!(parts[2].children.len(), 2);
    }

    #[test]
    fn disjoint_children_are_untouched() {
        let mut parts = vec![part("a", &[1]), part("b", &[2])];
        assert!(extract_shared_children(&mut parts).is_empty());
        assert_eq!(parts[0].children.len() + parts[1].children.len(), 2);
    }

    #[test]
    fn parts_emptied_by_the_trim_are_dropped_in_order() {
        let mut session = MemorySession::new();
        let t = session
            .model_mut()
            .add_box(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));

        let parts = vec![part("a", &[t, 20]), part("b", &[t]), part("c", &[30])];
        let (kept, dropped) =
            strip_symmetry_children(&mut session, parts, &[DimTag::volume(t)]).unwrap();

        let kept: Vec<&str> = kept.iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(kept, vec!["a", "c"]);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].uid, "b");
        assert!(session.entities(Dim::Volume).is_empty());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_parts_without_a_trim_are_not_blamed_on_symmetry() {
        let mut session = MemorySession::new();
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let parts = vec![part("a", &[10]), part("b", &[])];
        let (kept, dropped) = tracing::subscriber::with_default(subscriber, || {
            strip_symmetry_children(&mut session, parts, &[]).unwrap()
        });

        assert_eq!(kept.len(), 1);
        assert_eq!(dropped[0].uid, "b");
        let log = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("b has no children after the fragment"));
        assert!(!log.contains("symmetry"));
    }
}
