//! Material bindings.

use tracing::{debug, info};

use super::stage::{Stage, MATERIAL_BINDING};
use crate::util::{Error, Result};

/// Prims with a direct `material:binding` to `material`.
pub fn direct_bindings(stage: &Stage, material: &str) -> Vec<String> {
    stage
        .traverse()
        .into_iter()
        .filter(|prim| {
            prim.relationship(MATERIAL_BINDING)
                .is_some_and(|rel| rel.targets.iter().any(|t| t == material))
        })
        .map(|prim| prim.path.clone())
        .collect()
}

/// Point every direct binding of `old` at `new`. Returns the rebound prims.
///
/// Inherited bindings follow automatically since only the authored
/// relationship changes.
pub fn reassign_bindings(stage: &mut Stage, old: &str, new: &str) -> Result<Vec<String>> {
    if !stage.has_prim(new) {
        return Err(Error::PrimNotFound(new.to_string()));
    }
    let rebound = direct_bindings(stage, old);
    for path in &rebound {
        let Some(prim) = stage.prim_mut(path) else {
            continue;
        };
        if let Some(rel) = prim.relationships.iter_mut().find(|r| r.name == MATERIAL_BINDING) {
            for target in rel.targets.iter_mut().filter(|t| *t == old) {
                *target = new.to_string();
            }
        }
        debug!("{}: {} -> {}", path, old, new);
    }
    info!("reassigned {} prim(s) from {} to {}", rebound.len(), old, new);
    Ok(rebound)
}

/// Bind `material` to each of `prims`.
pub fn assign_material<S: AsRef<str>>(stage: &mut Stage, prims: &[S], material: &str) -> Result<()> {
    for prim in prims {
        stage.bind_material(prim.as_ref(), material)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> Stage {
        let mut stage = Stage::new();
        stage.define_prim("/World/a", Some("Mesh")).unwrap();
        stage.define_prim("/World/b/child", Some("Mesh")).unwrap();
        stage.define_prim("/World/c", Some("Mesh")).unwrap();
        stage.define_prim("/mat/old", Some("Material")).unwrap();
        stage.define_prim("/mat/new", Some("Material")).unwrap();
        stage.define_prim("/mat/other", Some("Material")).unwrap();
        assign_material(&mut stage, &["/World/a", "/World/b"], "/mat/old").unwrap();
        stage.bind_material("/World/c", "/mat/other").unwrap();
        stage
    }

    #[test]
    fn test_reassign() {
        let mut stage = stage();
        let rebound = reassign_bindings(&mut stage, "/mat/old", "/mat/new").unwrap();
        assert_eq!(rebound, vec!["/World/a", "/World/b"]);
        assert_eq!(stage.bound_material("/World/a"), Some("/mat/new"));
        assert_eq!(stage.bound_material("/World/b/child"), Some("/mat/new"));
        assert_eq!(stage.bound_material("/World/c"), Some("/mat/other"));
        assert!(direct_bindings(&stage, "/mat/old").is_empty());
    }

    #[test]
    fn test_reassign_missing_target() {
        let mut stage = stage();
        let err = reassign_bindings(&mut stage, "/mat/old", "/mat/missing").unwrap_err();
        assert!(matches!(err, Error::PrimNotFound(_)));
        assert_eq!(stage.bound_material("/World/a"), Some("/mat/old"));
    }
}
