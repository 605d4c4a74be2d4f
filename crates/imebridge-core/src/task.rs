use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

thread_local! {
    static CURRENT_RUNNER: TaskRunner = TaskRunner::new();
}

/// Single-thread FIFO task queue.
///
/// `post_task` never runs anything; tasks only run from `run_until_idle`
/// (or `run_one`), so posting from inside a callback cannot re-enter the
/// caller.
#[derive(Clone, Default)]
pub struct TaskRunner {
    queue: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The runner bound to the calling thread.
    pub fn current() -> Self {
        CURRENT_RUNNER.with(|r| r.clone())
    }

    pub fn post_task(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    /// Runs the oldest pending task. Returns `false` if the queue was empty.
    pub fn run_one(&self) -> bool {
        // release the borrow before running: tasks may post more tasks
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Drains the queue, including tasks posted while draining.
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_one() {
            ran += 1;
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    pub fn same_queue(&self, other: &TaskRunner) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_fifo_and_deferred() {
        let runner = TaskRunner::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            runner.post_task(move || seen.borrow_mut().push(i));
        }
        assert!(seen.borrow().is_empty());
        assert_eq!(runner.pending(), 3);

        assert_eq!(runner.run_until_idle(), 3);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert!(runner.is_idle());
    }

    #[test]
    fn test_task_can_post_task() {
        let runner = TaskRunner::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let inner_runner = runner.clone();
        let s = seen.clone();
        runner.post_task(move || {
            s.borrow_mut().push("outer");
            let s2 = s.clone();
            inner_runner.post_task(move || s2.borrow_mut().push("inner"));
        });

        assert_eq!(runner.run_until_idle(), 2);
        assert_eq!(*seen.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_current_is_per_thread_singleton() {
        let a = TaskRunner::current();
        let b = TaskRunner::current();
        assert!(a.same_queue(&b));
        assert!(!a.same_queue(&TaskRunner::new()));

        let other_thread_pending = std::thread::spawn(|| {
            TaskRunner::current().post_task(|| {});
            TaskRunner::current().pending()
        })
        .join()
        .unwrap();
        assert_eq!(other_thread_pending, 1);
    }
}
