//! External matching rules attached to built entities.

use crate::domain::entity::{
    CommodityProperty, ExternalMatchRule, PatchSide, STITCHING_ATTRIBUTE, VM_IP_ATTRIBUTE,
};
use crate::domain::sample::{CommodityKind, EntityType};

/// Producers hand both used and capacity of what they sell to the merged
/// entity.
pub fn producer_rule<I>(sold: I) -> ExternalMatchRule
where
    I: IntoIterator<Item = CommodityKind>,
{
    sold.into_iter().fold(
        ExternalMatchRule::new(STITCHING_ATTRIBUTE, STITCHING_ATTRIBUTE),
        |rule, kind| {
            rule.patch(
                PatchSide::Selling,
                kind,
                &[CommodityProperty::Used, CommodityProperty::Capacity],
            )
        },
    )
}

pub fn consumer_rule<I>(bought: I) -> ExternalMatchRule
where
    I: IntoIterator<Item = CommodityKind>,
{
    bought.into_iter().fold(
        ExternalMatchRule::new(STITCHING_ATTRIBUTE, STITCHING_ATTRIBUTE),
        |rule, kind| rule.patch(PatchSide::Buying, kind, &[CommodityProperty::Used]),
    )
}

/// Standalone entities match through the server-side extended property of
/// `entity_type` and only patch used values.
pub fn standalone_rule<I>(entity_type: EntityType, side: PatchSide, kinds: I) -> ExternalMatchRule
where
    I: IntoIterator<Item = CommodityKind>,
{
    kinds.into_iter().fold(
        ExternalMatchRule::new(STITCHING_ATTRIBUTE, STITCHING_ATTRIBUTE).extended(entity_type),
        |rule, kind| rule.patch(side, kind, &[CommodityProperty::Used]),
    )
}

pub fn proxy_vm_rule() -> ExternalMatchRule {
    ExternalMatchRule::new(STITCHING_ATTRIBUTE, VM_IP_ATTRIBUTE)
}
