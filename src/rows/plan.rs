//! # Row Plans and the Plan Cache
//!
//! A [`RowPlan`] is the derived description of a row shape: field count,
//! variable-field count, total fixed size, and per-field info in
//! declaration order. Plans are derived once, cached, and shared; a plan is
//! never mutated after insertion.
//!
//! ## Cache Keying
//!
//! Plans are keyed by the identity (address and length) of the shape's
//! `'static` field-kind slice. Two shapes whose constants were deduplicated
//! to the same slice necessarily declare byte-identical kind lists and thus
//! derive identical plans, so a key collision hands out a correct plan.
//!
//! ## Concurrency
//!
//! The lookup path is read-mostly: readers share a `parking_lot` read
//! guard. A miss takes the write guard and re-checks before deriving, so
//! two racing writers never derive twice (double-checked lazy init).
//!
//! ## Dynamic Shapes
//!
//! [`ShapeRegistry`] backs the dynamically-typed `encode_any`/`decode_any`
//! entry points: a `TypeId`-keyed table of monomorphized encode/decode
//! thunks. A lookup miss is how `NotStruct`/`NotStructPointer` surface at
//! runtime.

use std::any::{Any, TypeId};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::rows::decoder::RowReader;
use crate::rows::encoder::RowWriter;
use crate::rows::kind::FieldKind;
use crate::rows::RowShape;

/// Per-field slot of a [`RowPlan`]: position in declaration order, declared
/// kind, and the fixed/variable classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub index: usize,
    pub kind: FieldKind,
    pub is_variable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPlan {
    pub fields: Vec<FieldInfo>,
    pub field_count: usize,
    pub var_count: usize,
    pub fixed_size: usize,
}

impl RowPlan {
    pub(crate) fn derive(kinds: &[FieldKind]) -> Self {
        let mut fields = Vec::with_capacity(kinds.len());
        let mut var_count = 0;
        let mut fixed_size = 0;
        for (index, &kind) in kinds.iter().enumerate() {
            let is_variable = kind.is_variable();
            if is_variable {
                var_count += 1;
            } else if let FieldKind::Scalar(s) = kind {
                fixed_size += s.width();
            }
            fields.push(FieldInfo {
                index,
                kind,
                is_variable,
            });
        }
        RowPlan {
            field_count: fields.len(),
            var_count,
            fixed_size,
            fields,
        }
    }
}

type PlanKey = (usize, usize);

#[derive(Debug, Default)]
pub(crate) struct PlanCache {
    plans: RwLock<HashMap<PlanKey, Arc<RowPlan>>>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached plan for `kinds`, deriving it on first use.
    pub fn plan_for(&self, kinds: &'static [FieldKind]) -> Arc<RowPlan> {
        let key: PlanKey = (kinds.as_ptr() as usize, kinds.len());
        if let Some(plan) = self.plans.read().get(&key) {
            return Arc::clone(plan);
        }
        let mut plans = self.plans.write();
        // Re-check under the write guard: a racing writer may have won.
        if let Some(plan) = plans.get(&key) {
            return Arc::clone(plan);
        }
        let plan = Arc::new(RowPlan::derive(kinds));
        plans.insert(key, Arc::clone(&plan));
        plan
    }
}

/// Monomorphized entry points for one registered row type.
#[derive(Clone, Copy)]
pub(crate) struct ErasedShape {
    pub kinds: &'static [FieldKind],
    pub write: fn(&dyn Any, &mut RowWriter<'_>) -> Result<()>,
    pub read: fn(&mut dyn Any, &mut RowReader<'_>) -> Result<()>,
}

fn erased_write<T>(value: &dyn Any, writer: &mut RowWriter<'_>) -> Result<()>
where
    T: for<'b> RowShape<'b> + Any,
{
    let row = value.downcast_ref::<T>().ok_or(Error::NotStruct)?;
    row.write_fields(writer)
}

fn erased_read<T>(out: &mut dyn Any, reader: &mut RowReader<'_>) -> Result<()>
where
    T: for<'b> RowShape<'b> + Any,
{
    let row = out.downcast_mut::<T>().ok_or(Error::NotStructPointer)?;
    row.read_fields(reader)
}

#[derive(Default)]
pub(crate) struct ShapeRegistry {
    entries: RwLock<HashMap<TypeId, ErasedShape>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T>(&self)
    where
        T: for<'b> RowShape<'b> + Any,
    {
        let shape = ErasedShape {
            kinds: <T as RowShape<'static>>::fields(),
            write: erased_write::<T>,
            read: erased_read::<T>,
        };
        self.entries.write().insert(TypeId::of::<T>(), shape);
    }

    pub fn get(&self, id: TypeId) -> Option<ErasedShape> {
        self.entries.read().get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::fixed::ScalarKind;

    #[test]
    fn derive_classifies_and_sizes_fields() {
        let kinds = [
            FieldKind::Scalar(ScalarKind::U32),
            FieldKind::Str,
            FieldKind::Scalar(ScalarKind::F64),
            FieldKind::ScalarSeq(ScalarKind::I16),
        ];
        let plan = RowPlan::derive(&kinds);
        assert_eq!(plan.field_count, 4);
        assert_eq!(plan.var_count, 2);
        assert_eq!(plan.fixed_size, 12);
        assert!(!plan.fields[0].is_variable);
        assert!(plan.fields[1].is_variable);
        assert_eq!(plan.fields[3].index, 3);
    }

    #[test]
    fn cache_hands_out_one_shared_plan() {
        static KINDS: [FieldKind; 2] = [FieldKind::Scalar(ScalarKind::Bool), FieldKind::Str];
        let cache = PlanCache::new();
        let a = cache.plan_for(&KINDS);
        let b = cache.plan_for(&KINDS);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn cache_serves_concurrent_readers() {
        static KINDS: [FieldKind; 1] = [FieldKind::Bytes];
        let cache = PlanCache::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let plan = cache.plan_for(&KINDS);
                        assert_eq!(plan.var_count, 1);
                    }
                });
            }
        });
    }
}
