//! 操作目录：启动时按固定顺序注册全部餐厅操作
//!
//! 注册顺序即 Oracle prompt 与 /operations 中的展示顺序；重名直接返回错误（启动失败）。

use std::sync::Arc;

use crate::core::ChatError;
use crate::tools::extras::{CreateExtra, CreateLabel, DeleteExtra, GetExtras, GetLabels};
use crate::tools::groups::{CreateMenuGroup, DeleteMenuGroup, GetMenuGroups};
use crate::tools::hours::{
    GetRestaurantInfo, ToggleOrdering, UpdateBusinessHours, UpdatePrepTime, UpdateRestaurantAddress,
};
use crate::tools::menu::{CreateMenuItem, DeleteMenuItem, GetMenuItems, UpdateMenuItem};
use crate::tools::orders::{CancelOrder, CompleteOrder, GetCompletedOrders, GetOrders};
use crate::tools::reports::{GenerateSalesReport, GetSalesTrends, GetTodayMetrics};
use crate::tools::{BackendClient, OperationRegistry};

/// 构建包含全部餐厅操作的注册表
pub fn build_registry(backend: Arc<BackendClient>) -> Result<OperationRegistry, ChatError> {
    let mut registry = OperationRegistry::new();
    register_all(&mut registry, backend)?;
    Ok(registry)
}

pub fn register_all(registry: &mut OperationRegistry, backend: Arc<BackendClient>) -> Result<(), ChatError> {
    // 餐厅信息 / 营业时间
    registry.register(GetRestaurantInfo::new())?;
    registry.register(UpdatePrepTime::new(backend.clone()))?;
    registry.register(UpdateBusinessHours::new(backend.clone()))?;
    registry.register(ToggleOrdering::pause())?;
    registry.register(ToggleOrdering::unpause())?;
    registry.register(UpdateRestaurantAddress::new(backend.clone()))?;

    // 菜单
    registry.register(CreateMenuItem::new(backend.clone()))?;
    registry.register(UpdateMenuItem::new(backend.clone()))?;
    registry.register(GetMenuItems::new(backend.clone()))?;
    registry.register(DeleteMenuItem::new(backend.clone()))?;

    // 分组
    registry.register(GetMenuGroups::new(backend.clone()))?;
    registry.register(CreateMenuGroup::new(backend.clone()))?;
    registry.register(DeleteMenuGroup::new(backend.clone()))?;

    // 报表
    registry.register(GetTodayMetrics::new(backend.clone()))?;
    registry.register(GetSalesTrends::new(backend.clone()))?;
    registry.register(GenerateSalesReport::new(backend.clone()))?;

    // 标签 / 加料
    registry.register(GetLabels::new(backend.clone()))?;
    registry.register(CreateLabel::new(backend.clone()))?;
    registry.register(GetExtras::new(backend.clone()))?;
    registry.register(CreateExtra::new(backend.clone()))?;
    registry.register(DeleteExtra::new(backend.clone()))?;

    // 订单
    registry.register(GetOrders::new(backend.clone()))?;
    registry.register(GetCompletedOrders::new(backend.clone()))?;
    registry.register(CancelOrder::new(backend.clone()))?;
    registry.register(CompleteOrder::new(backend))?;

    tracing::info!(count = registry.len(), "operations registered");
    Ok(())
}
