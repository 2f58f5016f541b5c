//! 树形实体视图模型
//!
//! 将带 parent_id 的扁平行集合组装为层级视图，供管理端展示
//! 层级实体（如角色树）使用。

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use serde::Serialize;

use crate::Entity;

/// 可组装为树的实体
pub trait TreeEntity: Entity
where
    Self::Id: Eq + Hash + Clone,
{
    /// 父节点 ID，根节点为 None
    fn parent_id(&self) -> Option<&Self::Id>;

    /// 树中展示用的标签
    fn label(&self) -> &str;
}

/// 树节点视图
///
/// `depth` 为距根的层数（根为 0），`path` 为自根起斜杠拼接的标签路径。
#[derive(Debug, Clone, Serialize)]
pub struct TreeEntityView<T> {
    pub item: T,
    pub depth: u32,
    pub path: String,
    pub children: Vec<TreeEntityView<T>>,
}

impl<T> TreeEntityView<T>
where
    T: TreeEntity,
    T::Id: Eq + Hash + Clone,
{
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// 在子树中查找节点
    pub fn find(&self, id: &T::Id) -> Option<&TreeEntityView<T>> {
        if self.item.id() == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// 前序遍历展开
    pub fn flatten(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a T>) {
        out.push(&self.item);
        for child in &self.children {
            child.collect_into(out);
        }
    }

    /// 子树节点总数（含自身）
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// 组装结果
///
/// 输入的每个节点恰好出现一次：要么挂在 `roots` 下，要么因父环
/// 无法挂载而进入 `detached`。父 ID 不在输入集合中的节点按根处理。
#[derive(Debug, Serialize)]
pub struct TreeAssembly<T> {
    pub roots: Vec<TreeEntityView<T>>,
    pub detached: Vec<T>,
}

impl<T> TreeAssembly<T>
where
    T: TreeEntity,
    T::Id: Eq + Hash + Clone,
{
    pub fn is_complete(&self) -> bool {
        self.detached.is_empty()
    }

    /// 全部树中的节点数（不含 detached）
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(|r| r.node_count()).sum()
    }

    /// 在所有根下查找节点
    pub fn find(&self, id: &T::Id) -> Option<&TreeEntityView<T>> {
        self.roots.iter().find_map(|r| r.find(id))
    }
}

/// 将扁平节点集组装为森林
///
/// 同级顺序保持输入顺序，仓储层负责按需要排序后再传入。
pub fn assemble<T>(items: Vec<T>) -> TreeAssembly<T>
where
    T: TreeEntity,
    T::Id: Eq + Hash + Clone,
{
    let ids: HashSet<T::Id> = items.iter().map(|n| n.id().clone()).collect();

    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut by_parent: HashMap<T::Id, Vec<usize>> = HashMap::new();
    let mut root_indices: Vec<usize> = Vec::new();

    for (i, slot) in slots.iter().enumerate() {
        let node = slot.as_ref().expect("slot filled above");
        match node.parent_id() {
            // 自指父节点也会落入这里，最终留在 detached
            Some(pid) if ids.contains(pid) => {
                by_parent.entry(pid.clone()).or_default().push(i);
            }
            _ => root_indices.push(i),
        }
    }

    let mut roots = Vec::with_capacity(root_indices.len());
    for i in root_indices {
        roots.push(build_node(i, 0, "", &mut slots, &by_parent));
    }

    // 只从根向下消费节点，父环成员不可达，原样返回
    let detached: Vec<T> = slots.into_iter().flatten().collect();

    TreeAssembly { roots, detached }
}

fn build_node<T>(
    index: usize,
    depth: u32,
    parent_path: &str,
    slots: &mut Vec<Option<T>>,
    by_parent: &HashMap<T::Id, Vec<usize>>,
) -> TreeEntityView<T>
where
    T: TreeEntity,
    T::Id: Eq + Hash + Clone,
{
    // 每个下标只归属一个父节点或根集合，二次消费不可能发生
    let item = slots[index].take().expect("node already consumed");
    let id = item.id().clone();

    let path = if parent_path.is_empty() {
        item.label().to_string()
    } else {
        format!("{}/{}", parent_path, item.label())
    };

    let children = by_parent
        .get(&id)
        .map(|indices| {
            indices
                .iter()
                .map(|&child| build_node(child, depth + 1, &path, slots, by_parent))
                .collect()
        })
        .unwrap_or_default();

    TreeEntityView {
        item,
        depth,
        path,
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Node {
        id: u32,
        parent: Option<u32>,
        name: &'static str,
    }

    impl Node {
        fn new(id: u32, parent: Option<u32>, name: &'static str) -> Self {
            Self { id, parent, name }
        }
    }

    impl Entity for Node {
        type Id = u32;

        fn id(&self) -> &u32 {
            &self.id
        }
    }

    impl TreeEntity for Node {
        fn parent_id(&self) -> Option<&u32> {
            self.parent.as_ref()
        }

        fn label(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn test_assemble_forest() {
        let assembly = assemble(vec![
            Node::new(1, None, "admin"),
            Node::new(2, Some(1), "ops"),
            Node::new(3, Some(1), "dev"),
            Node::new(4, Some(3), "dev-junior"),
            Node::new(5, None, "guest"),
        ]);

        assert!(assembly.is_complete());
        assert_eq!(assembly.roots.len(), 2);
        assert_eq!(assembly.node_count(), 5);

        let admin = &assembly.roots[0];
        assert_eq!(admin.children.len(), 2);
        assert_eq!(admin.depth, 0);
        assert_eq!(admin.path, "admin");

        let junior = assembly.find(&4).unwrap();
        assert_eq!(junior.depth, 2);
        assert_eq!(junior.path, "admin/dev/dev-junior");
        assert!(!junior.has_children());
    }

    #[test]
    fn test_sibling_order_preserved() {
        let assembly = assemble(vec![
            Node::new(1, None, "root"),
            Node::new(2, Some(1), "b"),
            Node::new(3, Some(1), "a"),
            Node::new(4, Some(1), "c"),
        ]);

        let labels: Vec<&str> = assembly.roots[0]
            .children
            .iter()
            .map(|c| c.item.name)
            .collect();
        assert_eq!(labels, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_orphan_becomes_root() {
        // 父节点 99 不在集合中
        let assembly = assemble(vec![
            Node::new(1, None, "root"),
            Node::new(2, Some(99), "orphan"),
        ]);

        assert!(assembly.is_complete());
        assert_eq!(assembly.roots.len(), 2);
        assert_eq!(assembly.roots[1].path, "orphan");
        assert_eq!(assembly.roots[1].depth, 0);
    }

    #[test]
    fn test_cycle_reported_detached() {
        let assembly = assemble(vec![
            Node::new(1, None, "root"),
            Node::new(2, Some(3), "x"),
            Node::new(3, Some(2), "y"),
        ]);

        assert!(!assembly.is_complete());
        assert_eq!(assembly.roots.len(), 1);
        assert_eq!(assembly.node_count(), 1);
        assert_eq!(assembly.detached.len(), 2);
    }

    #[test]
    fn test_self_parent_detached() {
        let assembly = assemble(vec![Node::new(1, Some(1), "loop")]);

        assert!(assembly.roots.is_empty());
        assert_eq!(assembly.detached.len(), 1);
    }

    #[test]
    fn test_child_of_cycle_detached() {
        let assembly = assemble(vec![
            Node::new(1, Some(2), "a"),
            Node::new(2, Some(1), "b"),
            Node::new(3, Some(1), "under-cycle"),
        ]);

        assert!(assembly.roots.is_empty());
        assert_eq!(assembly.detached.len(), 3);
    }

    #[test]
    fn test_flatten_preorder() {
        let assembly = assemble(vec![
            Node::new(1, None, "root"),
            Node::new(2, Some(1), "left"),
            Node::new(3, Some(2), "left-leaf"),
            Node::new(4, Some(1), "right"),
        ]);

        let names: Vec<&str> = assembly.roots[0].flatten().iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["root", "left", "left-leaf", "right"]);
    }

    #[test]
    fn test_empty_input() {
        let assembly = assemble(Vec::<Node>::new());
        assert!(assembly.roots.is_empty());
        assert!(assembly.is_complete());
        assert_eq!(assembly.node_count(), 0);
    }
}
