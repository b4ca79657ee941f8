use crate::error::BackendError;
use im::HashMap;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::cmp::{max, min};
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::iter::Iterator;
use std::ops::AddAssign;

/// A persistent skip list mapping keys to values while tracking the
/// index of every key. Each node carries a tower of forward and
/// backward links, and every link records how many level-0 steps it
/// skips, which is what makes `index_of` and `key_of` logarithmic.
///
/// All operations return a logically new list; the node table is a
/// shared-structure map so snapshots are cheap. The level generator is
/// a `SmallRng` supplied at construction, so tests can pin the tower
/// shape.
#[derive(Clone)]
pub struct SkipList<K, V>
where
    K: Clone + Debug + Hash + PartialEq + Eq,
    V: Clone + Debug + PartialEq,
{
    nodes: HashMap<K, Node<K, V>>,
    head: Tower<K>,
    rng: SmallRng,
    len: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct Node<K, V>
where
    K: Clone + Debug + PartialEq,
    V: Clone + Debug + PartialEq,
{
    tower: Tower<K>,
    key: K,
    value: V,
}

#[derive(Debug, Clone, PartialEq)]
struct Tower<K>
where
    K: Clone + Debug + PartialEq,
{
    next: Vec<Link<K>>,
    prev: Vec<Link<K>>,
    level: usize,
    is_head: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct Link<K>
where
    K: Clone + Debug + PartialEq,
{
    key: Option<K>,
    count: usize,
}

impl<K> AddAssign for Link<K>
where
    K: Clone + Debug + PartialEq,
{
    fn add_assign(&mut self, other: Self) {
        *self = Self {
            key: other.key,
            count: self.count + other.count,
        };
    }
}

impl<K> Tower<K>
where
    K: Debug + Clone + PartialEq,
{
    fn successor(&self) -> &Option<K> {
        if self.next.is_empty() {
            &None
        } else {
            &self.next[0].key
        }
    }

    fn remove_after(&mut self, from_level: usize, removed_level: usize, links: &[Link<K>]) {
        for (level, link) in links.iter().enumerate().take(self.level).skip(from_level) {
            if level < removed_level {
                self.next[level] = link.clone();
            } else {
                self.next[level].count -= 1;
            }
        }
    }

    fn remove_before(&mut self, from_level: usize, removed_level: usize, links: &[Link<K>]) {
        for (level, link) in links.iter().enumerate().take(self.level).skip(from_level) {
            if level < removed_level {
                self.prev[level] = link.clone();
            } else {
                self.prev[level].count -= 1;
            }
        }
    }

    fn insert_after(
        &mut self,
        new_key: &K,
        new_level: usize,
        from_level: usize,
        distance: usize,
    ) -> Result<(), BackendError> {
        if new_level > self.level && !self.is_head {
            return Err(BackendError::SkipList(
                "Cannot increase the level of a non-head node".to_string(),
            ));
        }
        self.level = max(self.level, new_level);

        for level in from_level..self.level {
            if level < new_level {
                let link = Link {
                    key: Some(new_key.clone()),
                    count: distance,
                };
                if self.next.len() == level {
                    self.next.push(link);
                } else {
                    self.next[level] = link;
                }
            } else {
                self.next[level].count += 1;
            }
        }
        Ok(())
    }

    fn insert_before(
        &mut self,
        new_key: &K,
        new_level: usize,
        from_level: usize,
        distance: usize,
    ) -> Result<(), BackendError> {
        if new_level > self.level {
            return Err(BackendError::SkipList(
                "Cannot increase the level on insert-before".to_string(),
            ));
        }
        for level in from_level..self.level {
            if level < new_level {
                self.prev[level] = Link {
                    key: Some(new_key.clone()),
                    count: distance,
                };
            } else {
                self.prev[level].count += 1;
            }
        }
        Ok(())
    }
}

impl<K, V> PartialEq for SkipList<K, V>
where
    K: Clone + Debug + Hash + PartialEq + Eq,
    V: Clone + Debug + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.nodes.eq(&other.nodes)
    }
}

impl<K, V> Debug for SkipList<K, V>
where
    K: Clone + Debug + Hash + PartialEq + Eq,
    V: Clone + Debug + PartialEq,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SkipList")
            .field("len", &self.len)
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<K, V> Default for SkipList<K, V>
where
    K: Clone + Debug + Hash + PartialEq + Eq,
    V: Clone + Debug + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SkipList<K, V>
where
    K: Clone + Debug + Hash + PartialEq + Eq,
    V: Clone + Debug + PartialEq,
{
    pub fn new() -> SkipList<K, V> {
        Self::with_rng(SmallRng::from_entropy())
    }

    pub fn with_rng(rng: SmallRng) -> SkipList<K, V> {
        SkipList {
            nodes: HashMap::new(),
            head: Tower {
                next: Vec::new(),
                prev: Vec::new(),
                level: 1,
                is_head: true,
            },
            rng,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.nodes.get(key).map(|node| &node.value)
    }

    /// Insert at the very front of the list.
    pub fn insert_head(&self, key: K, value: V) -> Result<Self, BackendError> {
        let mut next = self.clone();
        next.do_insert_after(&None, key, value)?;
        Ok(next)
    }

    /// Insert immediately after `predecessor`, or at the head when the
    /// predecessor is `None`. Fails on a duplicate key or an unknown
    /// predecessor.
    pub fn insert_after(
        &self,
        predecessor: Option<&K>,
        key: K,
        value: V,
    ) -> Result<Self, BackendError> {
        let mut next = self.clone();
        next.do_insert_after(&predecessor.cloned(), key, value)?;
        Ok(next)
    }

    pub fn insert_index(&self, index: usize, key: K, value: V) -> Result<Self, BackendError> {
        if index == 0 {
            self.insert_head(key, value)
        } else {
            let predecessor = self
                .key_of_unsigned(index - 1)
                .cloned()
                .ok_or_else(|| BackendError::SkipList(format!("Insert index {} out of bounds", index)))?;
            self.insert_after(Some(&predecessor), key, value)
        }
    }

    /// Remove `key`, returning the new list and the index the key
    /// occupied.
    pub fn remove_key(&self, key: &K) -> Result<(Self, usize), BackendError> {
        let index = self.index_of(key).ok_or_else(|| {
            BackendError::SkipList("The given key cannot be removed because it does not exist".to_string())
        })?;
        let mut next = self.clone();
        next.do_remove_key(key)?;
        Ok((next, index))
    }

    pub fn remove_index(&self, index: usize) -> Result<(Self, K), BackendError> {
        let key = self
            .key_of_unsigned(index)
            .cloned()
            .ok_or_else(|| BackendError::SkipList(format!("Remove index {} out of bounds", index)))?;
        let mut next = self.clone();
        next.do_remove_key(&key)?;
        Ok((next, key))
    }

    /// Replace the value stored at `key`.
    pub fn set(&self, key: &K, value: V) -> Result<Self, BackendError> {
        let mut next = self.clone();
        let node = next
            .nodes
            .get_mut(key)
            .ok_or_else(|| BackendError::SkipList("Cannot set a nonexistent key".to_string()))?;
        node.value = value;
        Ok(next)
    }

    /// Walk backwards through the `prev` links, summing distances.
    pub fn index_of(&self, key: &K) -> Option<usize> {
        if !self.nodes.contains_key(key) {
            return None;
        }

        let mut count = 0;
        let mut cursor = key.clone();
        loop {
            let node = self.nodes.get(&cursor)?;
            let link = &node.tower.prev[node.tower.level - 1];
            count += link.count;
            match &link.key {
                Some(key) => cursor = key.clone(),
                None => break,
            }
        }
        Some(count - 1)
    }

    /// The key at `index`; a negative index counts back from the tail.
    pub fn key_of(&self, index: isize) -> Option<&K> {
        let index = if index < 0 {
            let adjusted = index + self.len as isize;
            if adjusted < 0 {
                return None;
            }
            adjusted as usize
        } else {
            index as usize
        };
        self.key_of_unsigned(index)
    }

    fn key_of_unsigned(&self, index: usize) -> Option<&K> {
        if index >= self.len {
            return None;
        }
        let target = index + 1;
        let mut tower = &self.head;
        let mut level = tower.level - 1;
        let mut count = 0;
        loop {
            while count + tower.next[level].count > target {
                level -= 1;
            }
            count += tower.next[level].count;
            let key: &Option<K> = &tower.next[level].key;
            if count == target {
                return key.as_ref();
            }
            tower = self.get_tower(key).ok()?;
        }
    }

    pub fn keys(&self) -> Keys<K, V> {
        Keys {
            entries: self.entries(),
        }
    }

    pub fn values(&self) -> Values<K, V> {
        Values {
            entries: self.entries(),
        }
    }

    /// A single-pass iterator over `(key, value)` pairs in list order.
    pub fn entries(&self) -> Entries<K, V> {
        Entries {
            cursor: self.head.successor(),
            nodes: &self.nodes,
        }
    }

    fn do_insert_after(
        &mut self,
        predecessor: &Option<K>,
        key: K,
        value: V,
    ) -> Result<(), BackendError> {
        if self.nodes.contains_key(&key) {
            return Err(BackendError::SkipList(format!(
                "Duplicate key {:?}",
                key
            )));
        }

        let new_level = self.random_level();
        let max_level = max(new_level, self.head.level);
        let successor = self.get_tower(predecessor)?.successor().clone();
        let mut pre = self.predecessors(predecessor, max_level)?;
        let mut suc = self.successors(&successor, max_level)?;

        self.len += 1;

        let mut pre_level = 0;
        let mut suc_level = 0;
        for level in 1..=max_level {
            let update_level = min(level, new_level);
            if level == max_level
                || pre.get(level).map(|l| &l.key) != pre.get(pre_level).map(|l| &l.key)
            {
                self.get_tower_mut(&pre[pre_level].key)?.insert_after(
                    &key,
                    update_level,
                    pre_level,
                    pre[pre_level].count,
                )?;
                pre_level = level;
            }
            if suc[suc_level].key.is_some()
                && (level == max_level
                    || suc.get(level).map(|l| &l.key) != suc.get(suc_level).map(|l| &l.key))
            {
                self.get_tower_mut(&suc[suc_level].key)?.insert_before(
                    &key,
                    update_level,
                    suc_level,
                    suc[suc_level].count,
                )?;
                suc_level = level;
            }
        }

        pre.truncate(new_level);
        suc.truncate(new_level);
        self.nodes.insert(
            key.clone(),
            Node {
                key,
                value,
                tower: Tower {
                    level: new_level,
                    prev: pre,
                    next: suc,
                    is_head: false,
                },
            },
        );
        Ok(())
    }

    fn do_remove_key(&mut self, key: &K) -> Result<V, BackendError> {
        let removed = self.nodes.remove(key).ok_or_else(|| {
            BackendError::SkipList(
                "The given key cannot be removed because it does not exist".to_string(),
            )
        })?;
        let max_level = self.head.level;
        let mut pre = self.predecessors(&removed.tower.prev[0].key, max_level)?;
        let mut suc = self.successors(&removed.tower.next[0].key, max_level)?;

        for level in 0..max_level {
            let distance = pre[level].count + suc[level].count - 1;
            pre[level].count = distance;
            suc[level].count = distance;
        }

        self.len -= 1;
        let mut pre_level = 0;
        let mut suc_level = 0;

        for level in 1..=max_level {
            let update_level = min(level, removed.tower.level);
            if level == max_level
                || pre.get(level).map(|l| &l.key) != pre.get(pre_level).map(|l| &l.key)
            {
                self.get_tower_mut(&pre[pre_level].key)?.remove_after(
                    pre_level,
                    update_level,
                    &suc,
                );
                pre_level = level;
            }
            if suc[suc_level].key.is_some()
                && (level == max_level
                    || suc.get(level).map(|l| &l.key) != suc.get(suc_level).map(|l| &l.key))
            {
                self.get_tower_mut(&suc[suc_level].key)?.remove_before(
                    suc_level,
                    update_level,
                    &pre,
                );
                suc_level = level;
            }
        }
        Ok(removed.value)
    }

    fn get_tower(&self, key: &Option<K>) -> Result<&Tower<K>, BackendError> {
        if let Some(ref k) = key {
            self.nodes
                .get(k)
                .map(|node| &node.tower)
                .ok_or_else(|| BackendError::SkipList("Key not found".to_string()))
        } else {
            Ok(&self.head)
        }
    }

    fn get_tower_mut(&mut self, key: &Option<K>) -> Result<&mut Tower<K>, BackendError> {
        if let Some(ref k) = key {
            self.nodes
                .get_mut(k)
                .map(|node| &mut node.tower)
                .ok_or_else(|| BackendError::SkipList("Key not found".to_string()))
        } else {
            Ok(&mut self.head)
        }
    }

    fn predecessors(
        &self,
        predecessor: &Option<K>,
        max_level: usize,
    ) -> Result<Vec<Link<K>>, BackendError> {
        let mut pre = vec![Link {
            key: predecessor.clone(),
            count: 1,
        }];

        for level in 1..max_level {
            let mut link = pre[level - 1].clone();
            while link.key.is_some() {
                let tower = self.get_tower(&link.key)?;
                if tower.level > level {
                    break;
                }
                if tower.level < level {
                    return Err(BackendError::SkipList(
                        "Level lower than expected".to_string(),
                    ));
                }
                link += tower.prev[level - 1].clone();
            }
            pre.push(link);
        }
        Ok(pre)
    }

    fn successors(
        &self,
        successor: &Option<K>,
        max_level: usize,
    ) -> Result<Vec<Link<K>>, BackendError> {
        let mut suc = vec![Link {
            key: successor.clone(),
            count: 1,
        }];

        for level in 1..max_level {
            let mut link = suc[level - 1].clone();
            while link.key.is_some() {
                let tower = self.get_tower(&link.key)?;
                if tower.level > level {
                    break;
                }
                if tower.level < level {
                    return Err(BackendError::SkipList(
                        "Level lower than expected".to_string(),
                    ));
                }
                link += tower.next[level - 1].clone();
            }
            suc.push(link);
        }
        Ok(suc)
    }

    // Returns a random number from the geometric distribution with
    // p = 0.75. That is, returns k with probability p * (1 - p)^(k - 1):
    // 1 with probability 3/4, 2 with probability 3/16, and so on, by
    // counting two random bits per level in a 32-bit word, capped at 16.
    fn random_level(&mut self) -> usize {
        let word: u32 = self.rng.gen();
        let mut level = 1;
        while word < 1 << (32 - 2 * level) && level < 16 {
            level += 1;
        }
        level
    }
}

pub struct Entries<'a, K, V>
where
    K: Debug + Clone + PartialEq,
    V: Debug + Clone + PartialEq,
{
    cursor: &'a Option<K>,
    nodes: &'a HashMap<K, Node<K, V>>,
}

impl<'a, K, V> Iterator for Entries<'a, K, V>
where
    K: Debug + Clone + Hash + PartialEq + Eq,
    V: Debug + Clone + PartialEq,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        let key = self.cursor.as_ref()?;
        let node = self.nodes.get(key)?;
        self.cursor = node.tower.successor();
        Some((&node.key, &node.value))
    }
}

pub struct Keys<'a, K, V>
where
    K: Debug + Clone + Hash + PartialEq + Eq,
    V: Debug + Clone + PartialEq,
{
    entries: Entries<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V>
where
    K: Debug + Clone + Hash + PartialEq + Eq,
    V: Debug + Clone + PartialEq,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.entries.next().map(|(key, _)| key)
    }
}

pub struct Values<'a, K, V>
where
    K: Debug + Clone + Hash + PartialEq + Eq,
    V: Debug + Clone + PartialEq,
{
    entries: Entries<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V>
where
    K: Debug + Clone + Hash + PartialEq + Eq,
    V: Debug + Clone + PartialEq,
{
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.entries.next().map(|(_, value)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed() -> SkipList<&'static str, u32> {
        SkipList::with_rng(SmallRng::seed_from_u64(42))
    }

    fn to_vec<K, V>(list: &SkipList<K, V>) -> Vec<K>
    where
        K: Clone + Debug + Hash + PartialEq + Eq,
        V: Clone + Debug + PartialEq,
    {
        list.keys().cloned().collect()
    }

    #[test]
    fn test_index_of() -> Result<(), BackendError> {
        let s = fixed();

        // should return None on an empty list
        assert_eq!(s.index_of(&"foo"), None);

        // should return None for a nonexistent key
        let s = s.insert_head("foo", 10)?;
        assert_eq!(s.index_of(&"baz"), None);

        // should return 0 for the first list element
        assert_eq!(s.index_of(&"foo"), Some(0));

        // should return length-1 for the last list element
        let s = s.insert_after(Some(&"foo"), "bar", 20)?;
        let s = s.insert_after(Some(&"bar"), "baz", 30)?;
        assert_eq!(s.index_of(&"baz"), Some(s.len() - 1));

        // should adjust based on removed elements
        let (s, _) = s.remove_key(&"foo")?;
        assert_eq!(s.index_of(&"bar"), Some(0));
        assert_eq!(s.index_of(&"baz"), Some(1));
        let (s, _) = s.remove_key(&"bar")?;
        assert_eq!(s.index_of(&"baz"), Some(0));
        Ok(())
    }

    #[test]
    fn test_len() -> Result<(), BackendError> {
        let s = fixed();
        assert_eq!(s.len(), 0);

        let s = s.insert_head("a3", 3)?;
        let s = s.insert_head("a2", 2)?;
        let s = s.insert_head("a1", 1)?;
        assert_eq!(s.len(), 3);

        let (s, _) = s.remove_key(&"a2")?;
        assert_eq!(s.len(), 2);
        Ok(())
    }

    #[test]
    fn test_key_of() -> Result<(), BackendError> {
        let s = fixed();
        assert_eq!(s.key_of(0), None);

        let s = s.insert_head("a3", 3)?;
        let s = s.insert_head("a2", 2)?;
        let s = s.insert_head("a1", 1)?;
        assert_eq!(s.key_of(10), None);

        // should return the first key for index 0
        assert_eq!(s.key_of(0), Some(&"a1"));

        // negative indexes count from the tail
        assert_eq!(s.key_of(-1), Some(&"a3"));
        assert_eq!(s.key_of(-3), Some(&"a1"));
        assert_eq!(s.key_of(-4), None);

        // should return the last key for index length-1
        assert_eq!(s.key_of(s.len() as isize - 1), Some(&"a3"));

        // should not count removed elements
        let (s, _) = s.remove_key(&"a1")?;
        let (s, _) = s.remove_key(&"a3")?;
        assert_eq!(s.key_of(0), Some(&"a2"));
        Ok(())
    }

    #[test]
    fn test_get_and_set() -> Result<(), BackendError> {
        let s: SkipList<&str, &str> = SkipList::with_rng(SmallRng::seed_from_u64(7));
        assert_eq!(s.get(&"key4"), None);
        assert!(s.set(&"hello", "world").is_err());

        let s = s.insert_head("key2", "value2")?;
        let s = s.insert_head("key1", "value1")?;
        assert_eq!(s.get(&"key1"), Some(&"value1"));
        assert_eq!(s.get(&"key2"), Some(&"value2"));

        let updated = s.set(&"key2", "updated_value")?;
        assert_eq!(updated.get(&"key2"), Some(&"updated_value"));
        // the original snapshot is untouched
        assert_eq!(s.get(&"key2"), Some(&"value2"));
        Ok(())
    }

    #[test]
    fn test_insert_index() -> Result<(), BackendError> {
        let s: SkipList<&str, &str> = SkipList::with_rng(SmallRng::seed_from_u64(7));
        let s = s.insert_head("aaa", "AAA")?;
        let s = s.insert_after(Some(&"aaa"), "ccc", "CCC")?;
        let s = s.insert_index(1, "bbb", "BBB")?;
        assert_eq!(s.index_of(&"aaa"), Some(0));
        assert_eq!(s.index_of(&"bbb"), Some(1));
        assert_eq!(s.index_of(&"ccc"), Some(2));

        // should insert at the head if the index is zero
        let s = s.insert_index(0, "a", "aa")?;
        assert_eq!(s.key_of(0), Some(&"a"));

        // duplicate keys and unknown predecessors fail
        assert!(s.insert_index(0, "a", "again").is_err());
        assert!(s.insert_after(Some(&"zzz"), "x", "x").is_err());
        Ok(())
    }

    #[test]
    fn test_remove_index() -> Result<(), BackendError> {
        let s: SkipList<&str, &str> = SkipList::with_rng(SmallRng::seed_from_u64(7));
        let s = s.insert_head("ccc", "CCC")?;
        let s = s.insert_head("bbb", "BBB")?;
        let s = s.insert_head("aaa", "AAA")?;
        let (s, removed) = s.remove_index(1)?;
        assert_eq!(removed, "bbb");
        assert_eq!(s.index_of(&"aaa"), Some(0));
        assert_eq!(s.index_of(&"bbb"), None);
        assert_eq!(s.index_of(&"ccc"), Some(1));

        assert!(s.remove_index(100).is_err());
        Ok(())
    }

    #[test]
    fn test_remove_key_big() -> Result<(), BackendError> {
        let mut s: SkipList<String, u32> = SkipList::with_rng(SmallRng::seed_from_u64(1));
        for i in 0..10000 {
            let j = 9999 - i;
            s = s.insert_head(format!("a{}", j), j)?;
        }

        assert_eq!(s.index_of(&"a20".to_string()), Some(20));
        assert_eq!(s.index_of(&"a500".to_string()), Some(500));
        assert_eq!(s.index_of(&"a1000".to_string()), Some(1000));

        for i in 0..5000 {
            let j = (4999 - i) * 2 + 1;
            let (removed, _) = s.remove_index(j)?;
            s = removed;
        }

        assert_eq!(s.index_of(&"a4000".to_string()), Some(2000));
        assert_eq!(s.index_of(&"a1000".to_string()), Some(500));
        assert_eq!(s.index_of(&"a500".to_string()), Some(250));
        assert_eq!(s.index_of(&"a20".to_string()), Some(10));
        Ok(())
    }

    #[test]
    fn test_iteration_order() -> Result<(), BackendError> {
        let s: SkipList<String, u32> = SkipList::with_rng(SmallRng::seed_from_u64(3));
        let e1 = "actor1:10".to_string();
        let e2 = "actor1:11".to_string();
        let e3 = "actor2:12".to_string();
        let s = s.insert_head(e1.clone(), 10)?;
        assert_eq!(to_vec(&s), vec![e1.clone()]);
        let s = s.insert_after(Some(&e1), e2.clone(), 20)?;
        assert_eq!(to_vec(&s), vec![e1.clone(), e2.clone()]);
        let s = s.insert_after(Some(&e1), e3.clone(), 15)?;
        assert_eq!(to_vec(&s), vec![e1.clone(), e3.clone(), e2.clone()]);

        let values: Vec<u32> = s.values().copied().collect();
        assert_eq!(values, vec![10, 15, 20]);
        let entries: Vec<(String, u32)> = s
            .entries()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        assert_eq!(entries[1], (e3, 15));
        Ok(())
    }

    #[test]
    fn snapshots_share_structure_but_not_state() -> Result<(), BackendError> {
        let s: SkipList<&str, u32> = SkipList::with_rng(SmallRng::seed_from_u64(9));
        let s1 = s.insert_head("a", 1)?;
        let s2 = s1.insert_after(Some(&"a"), "b", 2)?;
        let s3 = s2.remove_key(&"a")?.0;

        assert_eq!(to_vec(&s1), vec!["a"]);
        assert_eq!(to_vec(&s2), vec!["a", "b"]);
        assert_eq!(to_vec(&s3), vec!["b"]);
        assert_eq!(s1.index_of(&"a"), Some(0));
        assert_eq!(s3.index_of(&"b"), Some(0));
        Ok(())
    }

    #[test]
    fn same_seed_gives_same_shape() -> Result<(), BackendError> {
        let build = || -> Result<SkipList<String, u32>, BackendError> {
            let mut s = SkipList::with_rng(SmallRng::seed_from_u64(99));
            for i in 0..100 {
                s = s.insert_head(format!("k{}", i), i)?;
            }
            Ok(s)
        };
        assert_eq!(build()?, build()?);
        Ok(())
    }
}
