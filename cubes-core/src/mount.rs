//! Single-view mount guard keyed on the surface handle.
//!
//! Hosts may re-run their mount hook many times (every effect pass, every
//! page transition). The guard makes mounting idempotent per surface and
//! hands the previous view back when the surface changes, so the caller can
//! tear it down.

#[derive(Debug, PartialEq)]
pub enum MountOutcome<V> {
    Mounted,
    /// A view already exists for this surface; nothing was initialized
    AlreadyMounted,
    /// A view for a different surface was replaced and is returned for
    /// teardown
    Replaced(V),
}

#[derive(Debug)]
pub struct Mount<K, V> {
    current: Option<(K, V)>,
}

impl<K, V> Default for Mount<K, V> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<K: PartialEq, V> Mount<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize a view for `key` unless one is already mounted for it.
    /// `init` only runs when a new view is needed; if it fails, the
    /// previously mounted view (if any) stays in place.
    pub fn mount_with<E>(
        &mut self,
        key: K,
        init: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<MountOutcome<V>, E> {
        if matches!(&self.current, Some((current, _)) if *current == key) {
            return Ok(MountOutcome::AlreadyMounted);
        }

        let view = init(&key)?;
        Ok(match self.current.replace((key, view)) {
            Some((_, old)) => MountOutcome::Replaced(old),
            None => MountOutcome::Mounted,
        })
    }

    pub fn unmount(&mut self) -> Option<V> {
        self.current.take().map(|(_, view)| view)
    }

    pub fn is_mounted(&self) -> bool {
        self.current.is_some()
    }

    pub fn view(&self) -> Option<&V> {
        self.current.as_ref().map(|(_, view)| view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_same_surface_initializes_once() {
        let mut mount: Mount<&str, u32> = Mount::new();
        let mut inits = 0;

        for _ in 0..3 {
            mount
                .mount_with("canvas", |_| {
                    inits += 1;
                    Ok::<_, Infallible>(inits)
                })
                .unwrap();
        }

        assert_eq!(inits, 1);
        assert_eq!(mount.view(), Some(&1));
    }

    #[test]
    fn test_outcomes() {
        let mut mount = Mount::new();
        let ok = |v: u32| move |_: &&str| Ok::<_, Infallible>(v);

        assert_eq!(mount.mount_with("a", ok(1)), Ok(MountOutcome::Mounted));
        assert_eq!(mount.mount_with("a", ok(2)), Ok(MountOutcome::AlreadyMounted));
        assert_eq!(mount.mount_with("b", ok(3)), Ok(MountOutcome::Replaced(1)));
        assert_eq!(mount.view(), Some(&3));
        assert_eq!(mount.unmount(), Some(3));
        assert!(!mount.is_mounted());
        assert_eq!(mount.unmount(), None);
    }

    #[test]
    fn test_failed_init_keeps_previous_view() {
        let mut mount = Mount::new();
        mount.mount_with("a", |_| Ok::<_, &str>(1)).unwrap();

        let result = mount.mount_with("b", |_| Err("no context"));
        assert_eq!(result, Err("no context"));
        assert_eq!(mount.view(), Some(&1));
        assert_eq!(mount.mount_with("a", |_| Err("unused")), Ok(MountOutcome::AlreadyMounted));
    }
}
